//! # API Route Modules
//!
//! | Prefix          | Module      |
//! |-----------------|-------------|
//! | `/v1/records*`  | [`records`] |
//! | `/v1/events`    | [`events`]  |

pub mod events;
pub mod records;
