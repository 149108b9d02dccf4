//! # Record Store
//!
//! [`RecordStore`] is the single serialization point for registry writes.
//! Each write method is one atomic check-then-write. The write is staged
//! first and handed to a commit hook under the store's lock; the hook may
//! persist the staged contents and assign an event sequence number, and an
//! error from it discards the write.
//!
//! [`InMemoryRecordStore`] keeps records in a `HashMap` plus an
//! insertion-order index and a handle index, all behind one
//! `parking_lot::RwLock`. The lock is never held across an `.await`.

use std::collections::HashMap;

use parking_lot::RwLock;
use sealreg_core::{RecordId, Timestamp};
use sealreg_fhe::{ClearValue, Handle};
use sealreg_state::{Record, RecordError};
use thiserror::Error;

/// Why an atomic write did not apply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreConflict {
    /// Id already present.
    #[error("id {0} already present")]
    DuplicateId(RecordId),

    /// Handle already backs the given record.
    #[error("handle already stored under {0}")]
    HandleInUse(RecordId),

    /// Id absent.
    #[error("id {0} not present")]
    NotFound(RecordId),

    /// Record was finalized with the given value.
    #[error("id {0} already finalized")]
    AlreadyFinalized(RecordId, ClearValue),

    /// Initial contents violate a store invariant.
    #[error("corrupt contents: {0}")]
    Corrupt(String),

    /// The commit hook refused the staged write.
    #[error("commit aborted: {0}")]
    Aborted(String),
}

/// Number of records in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub pending: usize,
    pub finalized: usize,
}

/// A write that has passed the store's checks but is not yet applied.
pub struct Staged<'a> {
    record: &'a Record,
    inner: &'a Inner,
}

impl Staged<'_> {
    /// The inserted or updated record.
    pub fn record(&self) -> &Record {
        self.record
    }

    /// Full contents in insertion order as they will be once applied.
    pub fn records(&self) -> Vec<Record> {
        let id = self.record.id();
        let mut records: Vec<Record> = self
            .inner
            .order
            .iter()
            .filter_map(|k| {
                if k == id {
                    Some(self.record.clone())
                } else {
                    self.inner.records.get(k).cloned()
                }
            })
            .collect();
        if !self.inner.records.contains_key(id) {
            records.push(self.record.clone());
        }
        records
    }
}

/// Hook run under the store's write lock with the staged write. `Err`
/// aborts the write and leaves the store unchanged.
pub type CommitHook<'a> = &'a mut dyn FnMut(&Staged<'_>) -> Result<(), String>;

/// Keyed record storage with atomic create and finalize.
pub trait RecordStore: Send + Sync {
    /// Insert `record` unless its id or its handle is already present.
    fn insert_if_absent(&self, record: Record, on_commit: CommitHook<'_>)
        -> Result<(), StoreConflict>;

    /// Finalize the record if it is still pending, returning the updated
    /// record.
    fn finalize_if_pending(
        &self,
        id: &RecordId,
        value: ClearValue,
        at: Timestamp,
        on_commit: CommitHook<'_>,
    ) -> Result<Record, StoreConflict>;

    /// Record by id.
    fn get(&self, id: &RecordId) -> Option<Record>;

    /// Ids in insertion order.
    fn list_ids(&self) -> Vec<RecordId>;

    /// All records in insertion order.
    fn records(&self) -> Vec<Record>;

    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records per state.
    fn counts(&self) -> RecordCounts {
        let records = self.records();
        let finalized = records.iter().filter(|r| r.is_finalized()).count();
        RecordCounts {
            pending: records.len() - finalized,
            finalized,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<RecordId, Record>,
    order: Vec<RecordId>,
    handles: HashMap<Handle, RecordId>,
    finalized: usize,
}

/// In-memory [`RecordStore`].
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    inner: RwLock<Inner>,
}

impl InMemoryRecordStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `records` in the given order. Rejects duplicate ids
    /// and handles shared between records.
    pub fn from_records(records: Vec<Record>) -> Result<Self, StoreConflict> {
        let mut inner = Inner::default();
        for record in records {
            let id = record.id().clone();
            if inner.records.contains_key(&id) {
                return Err(StoreConflict::Corrupt(format!("duplicate id {id}")));
            }
            if let Some(other) = inner.handles.insert(*record.encrypted_field(), id.clone()) {
                return Err(StoreConflict::Corrupt(format!(
                    "records {other} and {id} share a handle"
                )));
            }
            if record.is_finalized() {
                inner.finalized += 1;
            }
            inner.order.push(id.clone());
            inner.records.insert(id, record);
        }
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_if_absent(
        &self,
        record: Record,
        on_commit: CommitHook<'_>,
    ) -> Result<(), StoreConflict> {
        let mut inner = self.inner.write();
        let id = record.id().clone();
        if inner.records.contains_key(&id) {
            return Err(StoreConflict::DuplicateId(id));
        }
        if let Some(other) = inner.handles.get(record.encrypted_field()) {
            return Err(StoreConflict::HandleInUse(other.clone()));
        }
        on_commit(&Staged {
            record: &record,
            inner: &inner,
        })
        .map_err(StoreConflict::Aborted)?;
        inner.handles.insert(*record.encrypted_field(), id.clone());
        inner.order.push(id.clone());
        inner.records.insert(id, record);
        Ok(())
    }

    fn finalize_if_pending(
        &self,
        id: &RecordId,
        value: ClearValue,
        at: Timestamp,
        on_commit: CommitHook<'_>,
    ) -> Result<Record, StoreConflict> {
        let mut inner = self.inner.write();
        let mut record = inner
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreConflict::NotFound(id.clone()))?;
        match record.finalize(value, at) {
            Ok(()) => {}
            Err(RecordError::AlreadyFinalized { value, .. }) => {
                return Err(StoreConflict::AlreadyFinalized(id.clone(), value));
            }
            Err(e) => return Err(StoreConflict::Corrupt(e.to_string())),
        }
        on_commit(&Staged {
            record: &record,
            inner: &inner,
        })
        .map_err(StoreConflict::Aborted)?;
        inner.records.insert(id.clone(), record.clone());
        inner.finalized += 1;
        Ok(record)
    }

    fn get(&self, id: &RecordId) -> Option<Record> {
        self.inner.read().records.get(id).cloned()
    }

    fn list_ids(&self) -> Vec<RecordId> {
        self.inner.read().order.clone()
    }

    fn records(&self) -> Vec<Record> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    fn counts(&self) -> RecordCounts {
        let inner = self.inner.read();
        RecordCounts {
            pending: inner.records.len() - inner.finalized,
            finalized: inner.finalized,
        }
    }
}
