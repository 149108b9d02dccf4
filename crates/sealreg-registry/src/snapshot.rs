//! # Snapshot Persistence
//!
//! The full record set as one versioned JSON document:
//!
//! ```json
//! {"version":1,"registryId":"...","lastSequence":7,"records":[...]}
//! ```
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a reader never sees a half-written snapshot. Loading validates every
//! record invariant and the store invariants (unique ids, unique handles);
//! a violation is an error, never a partial load.
//!
//! Events are not persisted. `lastSequence` lets a restarted registry
//! continue numbering where it stopped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use sealreg_core::{sha256_digest, CanonicalBytes, ContentDigest, RegistryId};
use sealreg_state::Record;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::store::InMemoryRecordStore;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Registry the records belong to.
    pub registry_id: RegistryId,
    /// Sequence number of the last event emitted before the snapshot.
    pub last_sequence: u64,
    /// Records in insertion order.
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Build a current-version snapshot.
    pub fn new(registry_id: RegistryId, last_sequence: u64, records: Vec<Record>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            registry_id,
            last_sequence,
            records,
        }
    }

    /// Read and parse `path`. Record invariants are checked during parsing.
    pub fn read(path: &Path) -> Result<Self, RegistryError> {
        let bytes = fs::read(path).map_err(|e| {
            RegistryError::Persistence(format!("reading {}: {e}", path.display()))
        })?;
        let snapshot: Self = serde_json::from_slice(&bytes).map_err(|e| {
            RegistryError::Persistence(format!("parsing {}: {e}", path.display()))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RegistryError::Persistence(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Check store-level invariants and build a store from the records.
    pub fn into_store(self) -> Result<InMemoryRecordStore, RegistryError> {
        InMemoryRecordStore::from_records(self.records)
            .map_err(|e| RegistryError::Persistence(format!("invalid snapshot: {e}")))
    }

    /// Fingerprint of the record set: SHA-256 over its canonical JSON.
    /// Independent of `lastSequence`, so two registries holding the same
    /// records agree on it.
    pub fn digest(&self) -> Result<ContentDigest, RegistryError> {
        let canonical = CanonicalBytes::new(&self.records)
            .map_err(|e| RegistryError::Persistence(format!("canonicalizing records: {e}")))?;
        Ok(sha256_digest(&canonical))
    }

    /// Validate everything `into_store` would, without keeping the store.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.clone().into_store().map(|_| ())
    }

    /// Write atomically to `path`.
    pub fn write(&self, path: &Path) -> Result<(), RegistryError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| RegistryError::Persistence(format!("encoding snapshot: {e}")))?;
        let tmp = temp_path(path);
        let io_err = |e: std::io::Error| {
            RegistryError::Persistence(format!("writing {}: {e}", path.display()))
        };
        {
            let mut file = fs::File::create(&tmp).map_err(io_err)?;
            file.write_all(&json).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes snapshot writes for one registry.
///
/// Each write captures its snapshot after taking the lock, so two writers
/// never interleave on the temp file.
#[derive(Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SnapshotWriter {
    /// Writer targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture with `capture` and write, holding the writer lock throughout.
    pub fn persist(&self, capture: impl FnOnce() -> Snapshot) -> Result<(), RegistryError> {
        let _guard = self.lock.lock();
        capture().write(&self.path)
    }
}
