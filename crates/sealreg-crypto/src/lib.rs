//! # sealreg-crypto — Cryptographic Primitives
//!
//! - **Ed25519** signing and verification. Input proofs (handle binding) and
//!   disclosure proofs are both Ed25519 signatures over canonical statements.
//! - **Tagged SHA-256** for domain-separated derivations (handle derivation,
//!   keystreams in the simulated coprocessor).
//! - **Hex** codecs for the wire encodings of handles, proofs and values.
//!
//! ## Crate Policy
//!
//! - Depends only on `sealreg-core` internally.
//! - No mocking of cryptographic operations in tests.

pub mod ed25519;
pub mod hex;
pub mod sha256;

pub use ed25519::{verify, verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use sha256::tagged_hash;
