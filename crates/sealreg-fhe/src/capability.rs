//! # The Encrypted-Value Capability Trait
//!
//! Any homomorphic-encryption backend plugs into the registry through
//! [`EncryptedValueCapability`]. Encryption and disclosure are remote calls
//! and may suspend for an arbitrary time; verification is local.
//!
//! The registry never calls `verify` on an implementation it does not trust.
//! It holds its own [`ProofVerifier`] built from configured public keys, and
//! the `verify` default method exists so clients can pre-check a disclosure
//! before submitting it.

use std::fmt;

use async_trait::async_trait;
use sealreg_core::{Identity, RegistryId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handle::{ClearValue, Handle, HandleBinding};
use crate::proof::{DisclosureProof, InputProof, ProofVerifier};

/// Errors raised by a capability backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Backend is offline or did not respond.
    #[error("coprocessor unavailable: {0}")]
    Unavailable(String),

    /// Handle is not known to the backend.
    #[error("unknown handle {0}")]
    UnknownHandle(String),

    /// Caller is not permitted to request disclosure of this handle.
    #[error("{identity} is not permitted to disclose handle {handle}")]
    Unauthorized {
        /// Short handle prefix.
        handle: String,
        /// Requesting principal.
        identity: String,
    },

    /// Input rejected before encryption.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backend-side failure.
    #[error("coprocessor internal error: {0}")]
    Internal(String),
}

/// Principal asking for a disclosure. The registry is a principal of its
/// own kind, so no participant identity can stand in for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requester {
    /// A participant, such as the record owner.
    Identity(Identity),
    /// The registry instance itself.
    Registry(RegistryId),
}

impl From<Identity> for Requester {
    fn from(identity: Identity) -> Self {
        Self::Identity(identity)
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(identity) => write!(f, "identity {identity}"),
            Self::Registry(registry) => write!(f, "registry {registry}"),
        }
    }
}

/// Result of a successful `encrypt` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    /// Fresh opaque handle.
    pub handle: Handle,
    /// Proof the handle was issued for the requested binding.
    pub proof: InputProof,
}

/// Result of a successful `request_disclosure` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    /// Claimed cleartext.
    pub value: ClearValue,
    /// Authority attestation over `(registry, handle, value)`.
    pub proof: DisclosureProof,
}

/// Encrypt / disclose / verify interface of a homomorphic-encryption
/// coprocessor.
#[async_trait]
pub trait EncryptedValueCapability: Send + Sync {
    /// Encrypt `value` for the given `(registry, owner)` binding.
    async fn encrypt(
        &self,
        value: ClearValue,
        binding: &HandleBinding,
    ) -> Result<EncryptedInput, CapabilityError>;

    /// Ask the disclosure authority to decrypt `handle` on behalf of
    /// `requester`.
    async fn request_disclosure(
        &self,
        handle: &Handle,
        requester: &Requester,
    ) -> Result<Disclosure, CapabilityError>;

    /// Public keys the proofs of this backend verify against.
    fn proof_verifier(&self) -> ProofVerifier;

    /// Registry instance the backend attests disclosures for.
    fn registry(&self) -> &RegistryId;

    /// `true` iff `proof` attests `value` as the decryption of `handle`.
    fn verify(&self, handle: &Handle, value: ClearValue, proof: &DisclosureProof) -> bool {
        self.proof_verifier()
            .verify_disclosure(self.registry(), handle, value, proof)
            .is_ok()
    }
}
