//! Shared fixtures for the cross-crate scenarios under `tests/`.
//!
//! A [`Fixture`] wires a registry, the simulated coprocessor and both
//! protocol flows together with deterministic key pairs, so a second fixture
//! built from the same seeds trusts the same proofs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use sealreg_core::{Identity, RecordId, RegistryId};
use sealreg_crypto::Ed25519KeyPair;
use sealreg_fhe::SimulatedCoprocessor;
use sealreg_protocol::{CreationProtocol, CreationRequest, DisclosureFlow};
use sealreg_registry::{Registry, RegistryConfig, RegistryError};

/// Registry id used by every fixture.
pub const REGISTRY_ID: &str = "reg-it";

const COPROCESSOR_SEED: [u8; 32] = [0x11; 32];
const AUTHORITY_SEED: [u8; 32] = [0x22; 32];

/// Registry, coprocessor and flows for one scenario.
pub struct Fixture {
    pub registry: Arc<Registry>,
    pub coprocessor: Arc<SimulatedCoprocessor>,
    pub creation: CreationProtocol,
    pub disclosure: DisclosureFlow,
}

impl Fixture {
    /// Memory-only fixture.
    pub fn in_memory() -> Self {
        Self::open(None).unwrap_or_else(|e| panic!("in-memory registry failed to open: {e}"))
    }

    /// Fixture persisting to `snapshot_path`, loading it if present.
    pub fn open(snapshot_path: Option<PathBuf>) -> Result<Self, RegistryError> {
        let config = RegistryConfig {
            registry_id: registry_id(),
            coprocessor_key: Ed25519KeyPair::from_seed(&COPROCESSOR_SEED).public_key(),
            disclosure_authority: Ed25519KeyPair::from_seed(&AUTHORITY_SEED).public_key(),
            snapshot_path,
        };
        let registry = Arc::new(Registry::open(config)?);
        let coprocessor = Arc::new(SimulatedCoprocessor::new(
            registry_id(),
            Ed25519KeyPair::from_seed(&COPROCESSOR_SEED),
            Ed25519KeyPair::from_seed(&AUTHORITY_SEED),
        ));
        Ok(Self {
            creation: CreationProtocol::new(registry.clone(), coprocessor.clone()),
            disclosure: DisclosureFlow::new(registry.clone(), coprocessor.clone()),
            registry,
            coprocessor,
        })
    }
}

/// The fixtures' registry id.
pub fn registry_id() -> RegistryId {
    RegistryId::new(REGISTRY_ID).unwrap_or_else(|e| panic!("{e}"))
}

/// Creation request with a single public `category` field.
pub fn request(id: &str, caller: &str, value: u32) -> CreationRequest {
    CreationRequest {
        id: id.to_string(),
        caller: caller.to_string(),
        value: i64::from(value),
        public_fields: BTreeMap::from([("category".to_string(), "loan".to_string())]),
    }
}

/// Parse a record id.
pub fn rid(s: &str) -> RecordId {
    RecordId::new(s).unwrap_or_else(|e| panic!("{e}"))
}

/// Parse an identity.
pub fn who(s: &str) -> Identity {
    Identity::new(s).unwrap_or_else(|e| panic!("{e}"))
}
