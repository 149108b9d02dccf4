//! # Proof Formats and Verification
//!
//! Two statements are signed in this system and both are canonical JSON:
//!
//! ```text
//! input      {"domain":"sealreg/input/v1","handle":..,"owner":..,"registry":..}
//! disclosure {"domain":"sealreg/disclosure/v1","handle":..,"registry":..,"value":..}
//! ```
//!
//! The input statement is signed by the coprocessor key and proves the
//! handle was issued for exactly this `(registry, owner)`. The disclosure
//! statement is signed by the designated disclosure authority and proves
//! `value` is the decryption of `handle`.
//!
//! ## Security Invariant
//!
//! [`ProofVerifier`] is constructed from public keys only and has no way to
//! reach the coprocessor. The registry's decision to accept a handle or a
//! disclosed value depends on signatures alone.

use sealreg_core::error::CanonicalizationError;
use sealreg_core::{CanonicalBytes, RegistryId};
use sealreg_crypto::{hex, verify_with_public_key, Ed25519PublicKey, Ed25519Signature};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::handle::{ClearValue, Handle, HandleBinding};

/// Domain tag of the input (handle binding) statement.
pub const INPUT_DOMAIN: &str = "sealreg/input/v1";

/// Domain tag of the disclosure statement.
pub const DISCLOSURE_DOMAIN: &str = "sealreg/disclosure/v1";

/// Errors from proof verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Proof bytes could not be decoded.
    #[error("malformed proof: {0}")]
    Malformed(String),

    /// Proof names an authority that is not the designated one.
    #[error("proof signed by {presented}, expected designated authority {expected}")]
    WrongAuthority {
        /// Hex of the presented authority key.
        presented: String,
        /// Hex of the designated authority key.
        expected: String,
    },

    /// Signature does not verify over the re-derived statement.
    #[error("signature does not match statement: {0}")]
    BadSignature(String),

    /// Handle fails structural checks.
    #[error("handle is not well formed")]
    MalformedHandle,
}

#[derive(Serialize)]
struct InputStatement<'a> {
    domain: &'static str,
    registry: &'a str,
    owner: &'a str,
    handle: String,
}

#[derive(Serialize)]
struct DisclosureStatement<'a> {
    domain: &'static str,
    registry: &'a str,
    handle: String,
    value: u32,
}

/// Canonical bytes of the input statement for `handle` under `binding`.
pub fn input_statement(
    handle: &Handle,
    binding: &HandleBinding,
) -> Result<CanonicalBytes, CanonicalizationError> {
    let statement = InputStatement {
        domain: INPUT_DOMAIN,
        registry: binding.registry.as_str(),
        owner: binding.owner.as_str(),
        handle: handle.to_hex(),
    };
    CanonicalBytes::new(&statement)
}

/// Canonical bytes of the disclosure statement.
pub fn disclosure_statement(
    registry: &RegistryId,
    handle: &Handle,
    value: ClearValue,
) -> Result<CanonicalBytes, CanonicalizationError> {
    let statement = DisclosureStatement {
        domain: DISCLOSURE_DOMAIN,
        registry: registry.as_str(),
        handle: handle.to_hex(),
        value: value.get(),
    };
    CanonicalBytes::new(&statement)
}

// ---------------------------------------------------------------------------
// Input proof
// ---------------------------------------------------------------------------

/// Well-formedness proof returned with a freshly encrypted handle.
///
/// Wire form: 64-byte Ed25519 signature, hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputProof(pub Ed25519Signature);

impl InputProof {
    /// Parse from 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, VerifyError> {
        Ed25519Signature::from_hex(s)
            .map(Self)
            .map_err(|e| VerifyError::Malformed(e.to_string()))
    }

    /// Hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

// ---------------------------------------------------------------------------
// Disclosure proof
// ---------------------------------------------------------------------------

/// Proof that a cleartext is the decryption of a specific handle.
///
/// Wire form: 96 bytes, `authority_key (32) ‖ signature (64)`, hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosureProof {
    /// Key of the authority that signed.
    pub authority: Ed25519PublicKey,
    /// Signature over the disclosure statement.
    pub signature: Ed25519Signature,
}

impl DisclosureProof {
    /// Byte length of the wire form.
    pub const LEN: usize = 96;

    /// Wire bytes.
    pub fn to_bytes(&self) -> [u8; 96] {
        let mut out = [0u8; 96];
        out[..32].copy_from_slice(self.authority.as_bytes());
        out[32..].copy_from_slice(self.signature.as_bytes());
        out
    }

    /// Parse wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        if bytes.len() != Self::LEN {
            return Err(VerifyError::Malformed(format!(
                "disclosure proof must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        let mut authority = [0u8; 32];
        authority.copy_from_slice(&bytes[..32]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[32..]);
        Ok(Self {
            authority: Ed25519PublicKey(authority),
            signature: Ed25519Signature(signature),
        })
    }

    /// Hex of the wire bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.to_bytes())
    }

    /// Parse hex of the wire bytes.
    pub fn from_hex(s: &str) -> Result<Self, VerifyError> {
        let bytes = hex::decode(s).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for DisclosureProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DisclosureProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Public-key-only checker for both proof kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofVerifier {
    /// Key the coprocessor signs input statements with.
    pub coprocessor_key: Ed25519PublicKey,
    /// Key of the designated disclosure authority.
    pub disclosure_authority: Ed25519PublicKey,
}

impl ProofVerifier {
    /// Build from the two trusted public keys.
    pub fn new(coprocessor_key: Ed25519PublicKey, disclosure_authority: Ed25519PublicKey) -> Self {
        Self {
            coprocessor_key,
            disclosure_authority,
        }
    }

    /// Check that `handle` was issued by the coprocessor for `binding`.
    pub fn verify_input(
        &self,
        handle: &Handle,
        binding: &HandleBinding,
        proof: &InputProof,
    ) -> Result<(), VerifyError> {
        if !handle.is_well_formed() {
            return Err(VerifyError::MalformedHandle);
        }
        let statement =
            input_statement(handle, binding).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        verify_with_public_key(&statement, &proof.0, &self.coprocessor_key)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))
    }

    /// Check that `value` is the designated authority's attested decryption
    /// of `handle` for `registry`.
    pub fn verify_disclosure(
        &self,
        registry: &RegistryId,
        handle: &Handle,
        value: ClearValue,
        proof: &DisclosureProof,
    ) -> Result<(), VerifyError> {
        if proof.authority != self.disclosure_authority {
            return Err(VerifyError::WrongAuthority {
                presented: proof.authority.to_hex(),
                expected: self.disclosure_authority.to_hex(),
            });
        }
        let statement = disclosure_statement(registry, handle, value)
            .map_err(|e| VerifyError::Malformed(e.to_string()))?;
        verify_with_public_key(&statement, &proof.signature, &self.disclosure_authority)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealreg_core::Identity;
    use sealreg_crypto::Ed25519KeyPair;

    fn binding(registry: &str, owner: &str) -> HandleBinding {
        HandleBinding::new(
            RegistryId::new(registry).unwrap(),
            Identity::new(owner).unwrap(),
        )
    }

    fn setup() -> (Ed25519KeyPair, Ed25519KeyPair, ProofVerifier) {
        let cop = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let auth = Ed25519KeyPair::from_seed(&[2u8; 32]);
        let v = ProofVerifier::new(cop.public_key(), auth.public_key());
        (cop, auth, v)
    }

    #[test]
    fn input_proof_bound_to_registry_and_owner() {
        let (cop, _, verifier) = setup();
        let handle = Handle::from_bytes([9u8; 32]);
        let b = binding("reg-a", "0xAA");
        let proof = InputProof(cop.sign(&input_statement(&handle, &b).unwrap()));

        assert!(verifier.verify_input(&handle, &b, &proof).is_ok());
        assert!(verifier
            .verify_input(&handle, &binding("reg-b", "0xAA"), &proof)
            .is_err());
        assert!(verifier
            .verify_input(&handle, &binding("reg-a", "0xBB"), &proof)
            .is_err());
    }

    #[test]
    fn zero_handle_rejected_before_signature_check() {
        let (cop, _, verifier) = setup();
        let handle = Handle::from_bytes([0u8; 32]);
        let b = binding("reg-a", "0xAA");
        let proof = InputProof(cop.sign(&input_statement(&handle, &b).unwrap()));
        assert_eq!(
            verifier.verify_input(&handle, &b, &proof),
            Err(VerifyError::MalformedHandle)
        );
    }

    #[test]
    fn disclosure_proof_binds_handle_and_value() {
        let (_, auth, verifier) = setup();
        let registry = RegistryId::new("reg-a").unwrap();
        let handle = Handle::from_bytes([3u8; 32]);
        let value = ClearValue::from(138);
        let proof = DisclosureProof {
            authority: auth.public_key(),
            signature: auth.sign(&disclosure_statement(&registry, &handle, value).unwrap()),
        };

        assert!(verifier.verify_disclosure(&registry, &handle, value, &proof).is_ok());
        assert!(verifier
            .verify_disclosure(&registry, &handle, ClearValue::from(139), &proof)
            .is_err());
        assert!(verifier
            .verify_disclosure(&registry, &Handle::from_bytes([4u8; 32]), value, &proof)
            .is_err());
        let other_registry = RegistryId::new("reg-b").unwrap();
        assert!(verifier
            .verify_disclosure(&other_registry, &handle, value, &proof)
            .is_err());
    }

    #[test]
    fn disclosure_from_foreign_authority_rejected() {
        let (_, _, verifier) = setup();
        let rogue = Ed25519KeyPair::from_seed(&[3u8; 32]);
        let registry = RegistryId::new("reg-a").unwrap();
        let handle = Handle::from_bytes([3u8; 32]);
        let value = ClearValue::from(1);
        let proof = DisclosureProof {
            authority: rogue.public_key(),
            signature: rogue.sign(&disclosure_statement(&registry, &handle, value).unwrap()),
        };
        assert!(matches!(
            verifier.verify_disclosure(&registry, &handle, value, &proof),
            Err(VerifyError::WrongAuthority { .. })
        ));
    }

    #[test]
    fn disclosure_proof_wire_form() {
        let (_, auth, _) = setup();
        let proof = DisclosureProof {
            authority: auth.public_key(),
            signature: auth.sign(&CanonicalBytes::new(&"x").unwrap()),
        };
        let hex = proof.to_hex();
        assert_eq!(hex.len(), DisclosureProof::LEN * 2);
        assert_eq!(DisclosureProof::from_hex(&hex).unwrap(), proof);
        assert!(DisclosureProof::from_hex(&hex[..100]).is_err());
        assert!(matches!(
            DisclosureProof::from_bytes(&[0u8; 10]),
            Err(VerifyError::Malformed(_))
        ));
    }

    #[test]
    fn statement_layout_is_stable() {
        let registry = RegistryId::new("r").unwrap();
        let handle = Handle::from_bytes([1u8; 32]);
        let bytes = disclosure_statement(&registry, &handle, ClearValue::from(138)).unwrap();
        let s = std::str::from_utf8(bytes.as_bytes()).unwrap();
        assert_eq!(
            s,
            format!(
                r#"{{"domain":"sealreg/disclosure/v1","handle":"{}","registry":"r","value":138}}"#,
                "01".repeat(32)
            )
        );
    }
}
