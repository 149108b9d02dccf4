//! # sealreg-core — Foundational Types for the Sealed Registry
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! type-system primitives the registry, the encrypted-value capability and
//! the protocols all agree on.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `RecordId`, `Identity` and
//!    `RegistryId` are validated newtypes. No bare strings cross a crate
//!    boundary as identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** Every signed statement (handle binding,
//!    disclosure attestation) and every digest flows through
//!    `CanonicalBytes::new()`. Two parties that agree on a statement always
//!    agree on its bytes.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sealreg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CryptoError, ValidationError};
pub use identity::{Identity, RecordId, RegistryId};
pub use temporal::Timestamp;
