//! # Handles and the Cleartext Domain
//!
//! A [`Handle`] is an opaque 32-byte reference to a ciphertext held by the
//! coprocessor. It carries no cleartext information and never changes once
//! issued.
//!
//! The cleartext domain is unsigned 32-bit integers. [`ClearValue`] is the
//! only way to name a cleartext in this workspace; its constructor rejects
//! negative and out-of-range inputs.

use sealreg_core::{Identity, RegistryId};
use sealreg_crypto::hex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Opaque reference to a homomorphically encrypted value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle([u8; 32]);

impl Handle {
    /// Byte length of a handle.
    pub const LEN: usize = 32;

    /// Wrap raw handle bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw handle bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, DomainError> {
        hex::decode_array::<32>(s)
            .map(Self)
            .map_err(|e| DomainError::MalformedHandle(e.to_string()))
    }

    /// Short prefix for log fields. Never log full handles.
    pub fn short(&self) -> String {
        hex::prefix(&self.0)
    }

    /// Structural well-formedness. The all-zero handle is the "uninitialized"
    /// sentinel of HE coprocessors and is never issued.
    pub fn is_well_formed(&self) -> bool {
        self.0.iter().any(|b| *b != 0)
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({}...)", self.short())
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors constructing values of the capability's domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Value is negative or exceeds `u32::MAX`.
    #[error("value {0} is outside the accepted domain 0..=4294967295")]
    OutOfRange(i128),

    /// Encoded value is not exactly four big-endian bytes.
    #[error("encoded value must be 4 bytes, got {0}")]
    BadEncoding(usize),

    /// Handle bytes are not 32 bytes of hex.
    #[error("malformed handle: {0}")]
    MalformedHandle(String),
}

/// A cleartext value of the capability's domain (`0..=2^32-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClearValue(u32);

impl ClearValue {
    /// Construct from any integer, rejecting values outside the domain.
    pub fn new(value: impl Into<i128>) -> Result<Self, DomainError> {
        let value = value.into();
        u32::try_from(value)
            .map(Self)
            .map_err(|_| DomainError::OutOfRange(value))
    }

    /// The inner `u32`.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Wire encoding: four bytes, big-endian.
    pub fn encode(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Decode the four-byte big-endian wire encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, DomainError> {
        <[u8; 4]>::try_from(bytes)
            .map(|b| Self(u32::from_be_bytes(b)))
            .map_err(|_| DomainError::BadEncoding(bytes.len()))
    }
}

impl From<u32> for ClearValue {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for ClearValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `(registry, caller)` pair a handle is bound to at encryption time.
///
/// A handle presented under any other pair fails input-proof verification,
/// so it cannot be replayed into another registry or by another caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleBinding {
    /// Registry instance the handle is destined for.
    pub registry: RegistryId,
    /// Caller who requested the encryption and will own the record.
    pub owner: Identity,
}

impl HandleBinding {
    /// Bind to a registry and caller.
    pub fn new(registry: RegistryId, owner: Identity) -> Self {
        Self { registry, owner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_value_domain_bounds() {
        assert_eq!(ClearValue::new(0i64).unwrap().get(), 0);
        assert_eq!(ClearValue::new(u32::MAX as i64).unwrap().get(), u32::MAX);
        assert_eq!(ClearValue::new(-1i64), Err(DomainError::OutOfRange(-1)));
        assert_eq!(
            ClearValue::new(u32::MAX as i64 + 1),
            Err(DomainError::OutOfRange(4_294_967_296))
        );
    }

    #[test]
    fn clear_value_wire_encoding() {
        let v = ClearValue::from(138);
        assert_eq!(v.encode(), [0, 0, 0, 0x8a]);
        assert_eq!(ClearValue::decode(&v.encode()).unwrap(), v);
        assert_eq!(ClearValue::decode(&[1, 2, 3]), Err(DomainError::BadEncoding(3)));
    }

    #[test]
    fn handle_hex_and_well_formedness() {
        let h = Handle::from_bytes([7u8; 32]);
        assert!(h.is_well_formed());
        assert_eq!(Handle::from_hex(&h.to_hex()).unwrap(), h);
        assert!(!Handle::from_bytes([0u8; 32]).is_well_formed());
        assert!(Handle::from_hex("0707").is_err());
    }

    #[test]
    fn handle_debug_shows_only_prefix() {
        let h = Handle::from_bytes([0xab; 32]);
        assert_eq!(format!("{h:?}"), "Handle(abababab...)");
    }
}
