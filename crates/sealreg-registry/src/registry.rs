//! # Registry Service
//!
//! The source of truth for record existence, ownership and state.
//!
//! ## Security Invariant
//!
//! Proofs are checked with a [`ProofVerifier`] built from configured public
//! keys. `finalize` re-derives the handle from the stored record and never
//! accepts a caller-supplied handle, so a proof for record A cannot finalize
//! record B. A handle may back only one record, which closes the remaining
//! replay path.
//!
//! Verification happens before the store's write lock is taken; the store
//! then re-checks the state atomically. The handle is immutable, so a proof
//! verified outside the lock is still valid against the record inside it.
//!
//! ## Durability
//!
//! With a snapshot path, every accepted mutation is written to disk while
//! it is still staged in the store. A failed write aborts the mutation with
//! `Persistence`: no record change, no event. `open` writes the snapshot
//! once, so an unwritable location fails at startup.

use std::path::PathBuf;
use std::sync::Arc;

use sealreg_core::{Identity, RecordId, RegistryId, Timestamp};
use sealreg_crypto::Ed25519PublicKey;
use sealreg_fhe::{ClearValue, DisclosureProof, Handle, HandleBinding, InputProof, ProofVerifier};
use sealreg_state::{PublicMetadata, Record};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::RegistryError;
use crate::event::{EventBus, EventKind, RegistryEvent};
use crate::read::{Reader, RecordView};
use crate::snapshot::{Snapshot, SnapshotWriter};
use crate::store::{InMemoryRecordStore, RecordCounts, RecordStore, Staged, StoreConflict};

/// Static configuration of one registry instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Identifier bound into every handle and disclosure statement.
    pub registry_id: RegistryId,
    /// Key the coprocessor signs input proofs with.
    pub coprocessor_key: Ed25519PublicKey,
    /// Key of the designated disclosure authority.
    pub disclosure_authority: Ed25519PublicKey,
    /// Where to persist snapshots. `None` keeps state in memory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl RegistryConfig {
    /// Verifier for this configuration's keys.
    pub fn verifier(&self) -> ProofVerifier {
        ProofVerifier::new(self.coprocessor_key, self.disclosure_authority)
    }
}

/// A creation request after boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Creator-chosen id.
    pub id: RecordId,
    /// Caller identity; becomes the owner.
    pub owner: Identity,
    /// Handle returned by the capability.
    pub encrypted_field: Handle,
    /// Plaintext attributes.
    pub public_metadata: PublicMetadata,
    /// Coprocessor proof binding the handle to `(registry, owner)`.
    pub proof: InputProof,
}

/// The registry.
pub struct Registry {
    id: RegistryId,
    verifier: ProofVerifier,
    store: Arc<dyn RecordStore>,
    events: EventBus,
    snapshots: Option<SnapshotWriter>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("records", &self.store.len())
            .field("last_sequence", &self.events.last_sequence())
            .field("snapshot", &self.snapshots.as_ref().map(|s| s.path().to_path_buf()))
            .finish()
    }
}

impl Registry {
    /// Open a registry. With a snapshot path, existing state is loaded and
    /// validated; a missing file starts empty. The snapshot is then written
    /// back, which fails here if the location is not writable.
    pub fn open(config: RegistryConfig) -> Result<Self, RegistryError> {
        let verifier = config.verifier();
        let Some(path) = config.snapshot_path else {
            return Ok(Self::in_memory(config.registry_id, verifier));
        };

        let (store, last_sequence) = if path.exists() {
            let snapshot = Snapshot::read(&path)?;
            if snapshot.registry_id != config.registry_id {
                return Err(RegistryError::Persistence(format!(
                    "snapshot belongs to registry {}, configured for {}",
                    snapshot.registry_id, config.registry_id
                )));
            }
            let last_sequence = snapshot.last_sequence;
            let digest = snapshot.digest()?;
            let store = snapshot.into_store()?;
            tracing::info!(
                path = %path.display(),
                records = store.len(),
                last_sequence,
                %digest,
                "loaded registry snapshot"
            );
            (store, last_sequence)
        } else {
            tracing::info!(path = %path.display(), "no snapshot found, starting empty");
            (InMemoryRecordStore::new(), 0)
        };

        let registry = Self {
            id: config.registry_id,
            verifier,
            store: Arc::new(store),
            events: EventBus::starting_after(last_sequence),
            snapshots: Some(SnapshotWriter::new(path)),
        };
        if let Some(writer) = &registry.snapshots {
            writer.persist(|| registry.snapshot())?;
        }
        Ok(registry)
    }

    /// Empty, memory-only registry.
    pub fn in_memory(id: RegistryId, verifier: ProofVerifier) -> Self {
        Self::with_store(id, verifier, Arc::new(InMemoryRecordStore::new()))
    }

    /// Registry over a caller-provided store. Not persisted.
    pub fn with_store(id: RegistryId, verifier: ProofVerifier, store: Arc<dyn RecordStore>) -> Self {
        Self {
            id,
            verifier,
            store,
            events: EventBus::default(),
            snapshots: None,
        }
    }

    /// This registry's identifier.
    pub fn id(&self) -> &RegistryId {
        &self.id
    }

    /// Trusted verifier.
    pub fn verifier(&self) -> &ProofVerifier {
        &self.verifier
    }

    /// Insert a new `Pending` record.
    ///
    /// # Errors
    ///
    /// `DuplicateId` if the id exists. `InvalidHandle` if the proof does not
    /// bind the handle to this registry and owner, or the handle already
    /// backs a record.
    pub fn create(&self, req: NewRecord) -> Result<Record, RegistryError> {
        if self.store.get(&req.id).is_some() {
            return Err(self.reject(RegistryError::DuplicateId(req.id)));
        }

        let binding = HandleBinding::new(self.id.clone(), req.owner.clone());
        if let Err(e) = self
            .verifier
            .verify_input(&req.encrypted_field, &binding, &req.proof)
        {
            return Err(self.reject(RegistryError::InvalidHandle {
                id: req.id,
                reason: e.to_string(),
            }));
        }

        let record = Record::new(
            req.id,
            req.owner,
            req.encrypted_field,
            req.public_metadata,
            Timestamp::now(),
        );
        let mut hook = |staged: &Staged<'_>| -> Result<(), String> {
            self.persist_staged(staged)?;
            let r = staged.record();
            self.events.publish(
                EventKind::RecordCreated {
                    id: r.id().clone(),
                    owner: r.owner().clone(),
                },
                r.created_at(),
            );
            Ok(())
        };
        match self.store.insert_if_absent(record.clone(), &mut hook) {
            Ok(()) => {}
            Err(StoreConflict::Aborted(reason)) => {
                return Err(self.reject(RegistryError::Persistence(reason)));
            }
            Err(StoreConflict::DuplicateId(id)) => {
                return Err(self.reject(RegistryError::DuplicateId(id)));
            }
            Err(StoreConflict::HandleInUse(other)) => {
                return Err(self.reject(RegistryError::InvalidHandle {
                    id: record.id().clone(),
                    reason: format!("handle already backs record {other}"),
                }));
            }
            Err(e) => return Err(self.reject(RegistryError::Persistence(e.to_string()))),
        }

        tracing::info!(
            record_id = %record.id(),
            owner = %record.owner(),
            handle = %record.encrypted_field().short(),
            "record created"
        );
        metrics::counter!("sealreg_records_created_total").increment(1);
        Ok(record)
    }

    /// Record a verified disclosure: `Pending → Finalized`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `AlreadyFinalized` (carrying the stored value) or
    /// `ProofInvalid`.
    pub fn finalize(
        &self,
        id: &RecordId,
        value: ClearValue,
        proof: &DisclosureProof,
    ) -> Result<Record, RegistryError> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| self.reject(RegistryError::NotFound(id.clone())))?;
        if let Some(stored) = record.disclosed_value() {
            return Err(self.reject(RegistryError::AlreadyFinalized {
                id: id.clone(),
                value: stored,
            }));
        }

        if let Err(e) =
            self.verifier
                .verify_disclosure(&self.id, record.encrypted_field(), value, proof)
        {
            return Err(self.reject(RegistryError::ProofInvalid {
                id: id.clone(),
                reason: e.to_string(),
            }));
        }

        let mut hook = |staged: &Staged<'_>| -> Result<(), String> {
            self.persist_staged(staged)?;
            let r = staged.record();
            if let (Some(disclosed_value), Some(at)) = (r.disclosed_value(), r.finalized_at()) {
                self.events.publish(
                    EventKind::Disclosed {
                        id: r.id().clone(),
                        disclosed_value,
                    },
                    at,
                );
            }
            Ok(())
        };
        let finalized = match self
            .store
            .finalize_if_pending(id, value, Timestamp::now(), &mut hook)
        {
            Ok(r) => r,
            Err(StoreConflict::AlreadyFinalized(id, value)) => {
                return Err(self.reject(RegistryError::AlreadyFinalized { id, value }));
            }
            Err(StoreConflict::NotFound(id)) => {
                return Err(self.reject(RegistryError::NotFound(id)));
            }
            Err(StoreConflict::Aborted(reason)) => {
                return Err(self.reject(RegistryError::Persistence(reason)));
            }
            Err(e) => return Err(self.reject(RegistryError::Persistence(e.to_string()))),
        };

        tracing::info!(
            record_id = %id,
            disclosed_value = %value,
            "record finalized"
        );
        metrics::counter!("sealreg_records_finalized_total").increment(1);
        Ok(finalized)
    }

    /// [`Registry::finalize`] over wire encodings: the value as four
    /// big-endian bytes and the 96-byte disclosure proof.
    ///
    /// A value of the wrong length is `InvalidInput`; an undecodable proof is
    /// `ProofInvalid`.
    pub fn finalize_encoded(
        &self,
        id: &RecordId,
        value_encoded: &[u8],
        proof: &[u8],
    ) -> Result<Record, RegistryError> {
        let value = ClearValue::decode(value_encoded)
            .map_err(|e| self.reject(RegistryError::InvalidInput(e.to_string())))?;
        let proof = DisclosureProof::from_bytes(proof).map_err(|e| {
            self.reject(RegistryError::ProofInvalid {
                id: id.clone(),
                reason: e.to_string(),
            })
        })?;
        self.finalize(id, value, &proof)
    }

    /// Record by id.
    pub fn get(&self, id: &RecordId) -> Result<Record, RegistryError> {
        self.store
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Record by id, rendered for `reader`.
    pub fn view(&self, id: &RecordId, reader: &Reader) -> Result<RecordView, RegistryError> {
        self.get(id).map(|r| RecordView::new(&r, reader))
    }

    /// Ids in insertion order.
    pub fn list_ids(&self) -> Vec<RecordId> {
        self.store.list_ids()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Records per state, without copying them.
    pub fn counts(&self) -> RecordCounts {
        self.store.counts()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Live event subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Logged events with sequence greater than `after`.
    pub fn events_since(&self, after: u64) -> Vec<RegistryEvent> {
        self.events.since(after)
    }

    /// Sequence number of the latest event.
    pub fn last_sequence(&self) -> u64 {
        self.events.last_sequence()
    }

    /// Current contents as a snapshot document.
    pub fn snapshot(&self) -> Snapshot {
        // Records first: the recorded sequence then covers every included
        // mutation.
        let records = self.store.records();
        Snapshot::new(self.id.clone(), self.events.last_sequence(), records)
    }

    /// Write `staged` ahead of its event. Runs under the store's write lock,
    /// so that event will carry `last_sequence + 1`.
    fn persist_staged(&self, staged: &Staged<'_>) -> Result<(), String> {
        let Some(writer) = &self.snapshots else {
            return Ok(());
        };
        let snapshot = Snapshot::new(
            self.id.clone(),
            self.events.last_sequence() + 1,
            staged.records(),
        );
        writer.persist(|| snapshot).map_err(|e| {
            tracing::error!(path = %writer.path().display(), error = %e, "snapshot write failed");
            metrics::counter!("sealreg_snapshot_failures_total").increment(1);
            e.to_string()
        })
    }

    fn reject(&self, err: RegistryError) -> RegistryError {
        match &err {
            RegistryError::AlreadyFinalized { id, value } => {
                tracing::info!(record_id = %id, stored_value = %value, "finalize on finalized record");
            }
            other => {
                tracing::warn!(reason = other.reason(), error = %other, "registry rejected request");
            }
        }
        metrics::counter!("sealreg_rejections_total", "reason" => err.reason()).increment(1);
        err
    }
}
