//! # sealreg-protocol — Creation and Disclosure
//!
//! The two client-side flows that sit between a caller, the
//! [`EncryptedValueCapability`](sealreg_fhe::EncryptedValueCapability) and
//! the [`Registry`](sealreg_registry::Registry).
//!
//! - **Creation** (`creation.rs`): validate at the boundary, encrypt bound
//!   to `(registry, caller)`, then create. Nothing reaches the registry when
//!   validation or encryption fails.
//!
//! - **Disclosure** (`disclosure.rs`): read the stored handle, request
//!   disclosure, pre-verify, finalize. Two suspension points; dropping the
//!   future at either leaves the record `Pending`.
//!
//! - **Phases** (`tracker.rs`): in-memory `Pending / AwaitingProof /
//!   Finalized` per record, driven by drop guards.

pub mod creation;
pub mod disclosure;
pub mod error;
pub mod tracker;

pub use creation::{CreationProtocol, CreationRequest};
pub use disclosure::{DisclosureFlow, DisclosureOutcome};
pub use error::ProtocolError;
pub use tracker::{AttemptGuard, PhaseTracker};
