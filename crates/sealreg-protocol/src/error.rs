//! Protocol error types.

use sealreg_core::RecordId;
use sealreg_fhe::CapabilityError;
use sealreg_registry::RegistryError;
use thiserror::Error;

/// Errors from the creation and disclosure flows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Rejected before the registry was touched: bad identifiers, metadata
    /// or value, or the capability could not encrypt.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The capability failed during disclosure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The disclosure proof failed the local pre-check or the registry's
    /// check.
    #[error("disclosure proof rejected for record {id}: {reason}")]
    ProofInvalid {
        /// Record identifier.
        id: RecordId,
        /// Verification failure.
        reason: String,
    },

    /// The registry refused the operation.
    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for ProtocolError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ProofInvalid { id, reason } => Self::ProofInvalid { id, reason },
            other => Self::Registry(other),
        }
    }
}
