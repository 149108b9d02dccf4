//! Registry error types.

use sealreg_core::RecordId;
use sealreg_fhe::ClearValue;
use thiserror::Error;

/// Errors returned by registry operations. None of them leaves a partial
/// mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A record with this id already exists.
    #[error("record {0} already exists")]
    DuplicateId(RecordId),

    /// Request payload is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The handle is malformed, not bound to this registry and owner, or
    /// already backs another record.
    #[error("invalid handle for record {id}: {reason}")]
    InvalidHandle {
        /// Record the handle was submitted for.
        id: RecordId,
        /// Why it was rejected.
        reason: String,
    },

    /// No record with this id.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The record was finalized earlier. Non-fatal: carries the stored value.
    #[error("record {id} is already finalized")]
    AlreadyFinalized {
        /// Record identifier.
        id: RecordId,
        /// The value stored by the accepted finalize.
        value: ClearValue,
    },

    /// The disclosure proof does not attest this value for the stored handle.
    #[error("disclosure proof rejected for record {id}: {reason}")]
    ProofInvalid {
        /// Record identifier.
        id: RecordId,
        /// Verification failure.
        reason: String,
    },

    /// Snapshot could not be read or written.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl RegistryError {
    /// Stable label for logs and the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "duplicate_id",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidHandle { .. } => "invalid_handle",
            Self::NotFound(_) => "not_found",
            Self::AlreadyFinalized { .. } => "already_finalized",
            Self::ProofInvalid { .. } => "proof_invalid",
            Self::Persistence(_) => "persistence",
        }
    }
}
