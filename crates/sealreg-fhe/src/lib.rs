//! # sealreg-fhe — Encrypted-Value Capability
//!
//! The registry never sees a cleartext value. It stores opaque [`Handle`]s
//! produced by an external homomorphic-encryption coprocessor and trusts
//! only the coprocessor's *proofs*, never its say-so.
//!
//! ## Architecture
//!
//! - **Handle** (`handle.rs`): the 32-byte opaque handle, the bounded
//!   cleartext domain (`ClearValue`, unsigned 32-bit) and the
//!   `(registry, owner)` binding a handle is created under.
//!
//! - **Proofs** (`proof.rs`): the input proof (coprocessor signature over the
//!   handle binding) and the disclosure proof (disclosure authority signature
//!   over `(registry, handle, value)`), plus [`ProofVerifier`], the pure
//!   checker the registry holds.
//!
//! - **Capability** (`capability.rs`): the [`EncryptedValueCapability`]
//!   trait: `encrypt`, `request_disclosure`, `verify`. Callers suspend on
//!   the first two; `verify` is local.
//!
//! - **Simulated** (`simulated.rs`): [`SimulatedCoprocessor`], an in-process
//!   implementation with real Ed25519 proofs, used by tests, the CLI and
//!   development deployments.
//!
//! ## Crate Policy
//!
//! - The scheme's arithmetic is out of scope; any concrete scheme that
//!   produces the same proof statements satisfies the trait.
//! - Depends on `sealreg-core` and `sealreg-crypto` internally.

pub mod capability;
pub mod handle;
pub mod proof;
#[cfg(feature = "simulated")]
pub mod simulated;

pub use capability::{
    CapabilityError, Disclosure, EncryptedInput, EncryptedValueCapability, Requester,
};
pub use handle::{ClearValue, DomainError, Handle, HandleBinding};
pub use proof::{DisclosureProof, InputProof, ProofVerifier, VerifyError};
#[cfg(feature = "simulated")]
pub use simulated::{DisclosureFault, SimulatedConfig, SimulatedCoprocessor};
