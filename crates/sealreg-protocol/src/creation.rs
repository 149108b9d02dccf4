//! # Creation Protocol
//!
//! ```text
//! validate(id, caller, value, metadata)
//!     └─▶ capability.encrypt(value, (registry, caller))   ← suspends
//!             └─▶ registry.create(id, caller, handle, metadata, proof)
//! ```
//!
//! Validation and encryption failures are `InvalidInput` and never reach the
//! registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use sealreg_core::{Identity, RecordId};
use sealreg_fhe::{ClearValue, EncryptedValueCapability, HandleBinding};
use sealreg_registry::{NewRecord, Registry, RegistryError};
use sealreg_state::{PublicMetadata, Record};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Unvalidated creation input as a caller supplies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRequest {
    /// Creator-chosen record id.
    pub id: String,
    /// Caller identity; becomes the owner.
    pub caller: String,
    /// Cleartext to encrypt. Must fit `0..=2^32-1`.
    pub value: i64,
    /// Plaintext attributes.
    #[serde(default)]
    pub public_fields: BTreeMap<String, String>,
}

struct Validated {
    id: RecordId,
    caller: Identity,
    value: ClearValue,
    metadata: PublicMetadata,
}

impl CreationRequest {
    fn validate(self) -> Result<Validated, ProtocolError> {
        let invalid = |e: &dyn std::fmt::Display| ProtocolError::InvalidInput(e.to_string());
        Ok(Validated {
            id: RecordId::new(self.id).map_err(|e| invalid(&e))?,
            caller: Identity::new(self.caller).map_err(|e| invalid(&e))?,
            value: ClearValue::new(self.value).map_err(|e| invalid(&e))?,
            metadata: PublicMetadata::new(self.public_fields).map_err(|e| invalid(&e))?,
        })
    }
}

/// Encrypt-then-create against one registry.
pub struct CreationProtocol {
    registry: Arc<Registry>,
    capability: Arc<dyn EncryptedValueCapability>,
}

impl CreationProtocol {
    /// Protocol over `registry` using `capability` for encryption.
    pub fn new(registry: Arc<Registry>, capability: Arc<dyn EncryptedValueCapability>) -> Self {
        Self {
            registry,
            capability,
        }
    }

    /// Run the protocol.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for validation or encryption failures; registry
    /// errors (`DuplicateId`, `InvalidHandle`) otherwise.
    pub async fn create(&self, request: CreationRequest) -> Result<Record, ProtocolError> {
        let v = request.validate()?;

        // Cheap early exit; the registry re-checks atomically.
        if self.registry.get(&v.id).is_ok() {
            return Err(RegistryError::DuplicateId(v.id).into());
        }

        let binding = HandleBinding::new(self.registry.id().clone(), v.caller.clone());
        let encrypted = self
            .capability
            .encrypt(v.value, &binding)
            .await
            .map_err(|e| {
                tracing::warn!(record_id = %v.id, error = %e, "encryption failed");
                ProtocolError::InvalidInput(format!("encryption failed: {e}"))
            })?;

        let record = self.registry.create(NewRecord {
            id: v.id,
            owner: v.caller,
            encrypted_field: encrypted.handle,
            public_metadata: v.metadata,
            proof: encrypted.proof,
        })?;
        Ok(record)
    }
}
