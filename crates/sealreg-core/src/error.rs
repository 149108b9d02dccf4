//! # Error Types
//!
//! Errors shared by every crate in the workspace. Domain crates define their
//! own enums and wrap these where they cross a boundary.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A boundary value failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Record identifier is malformed.
    #[error("invalid record id {value:?}: {reason}")]
    RecordId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Caller identity is malformed.
    #[error("invalid identity {value:?}: {reason}")]
    Identity {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Registry identifier is malformed.
    #[error("invalid registry id {value:?}: {reason}")]
    RegistryId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Timestamp is malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Encoding (hex, length) of key or signature material is wrong.
    #[error("encoding error: {0}")]
    Encoding(String),
}
