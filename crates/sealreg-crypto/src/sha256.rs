//! # Tagged SHA-256
//!
//! Domain-separated hashing over raw byte parts. Each part is length-prefixed
//! so `("ab", "c")` and `("a", "bc")` never collide.
//!
//! Statements that get signed go through `CanonicalBytes` instead; this is
//! for derivations that never leave the process that computes them (handle
//! derivation, keystreams).

use sha2::{Digest, Sha256};

/// Hash `parts` under the domain tag `domain`.
pub fn tagged_hash(domain: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
