//! # sealreg-registry — The Registry Store
//!
//! ## Architecture
//!
//! - **Store** (`store.rs`): the [`RecordStore`] trait and its in-memory
//!   implementation. Atomic insert-if-absent and finalize-if-pending; the
//!   single serialization point for writes.
//!
//! - **Registry** (`registry.rs`): create / finalize / get / list over a
//!   store, with proof checks against configured public keys.
//!
//! - **Events** (`event.rs`): sequenced `RecordCreated` / `Disclosed`
//!   notifications over a broadcast channel plus a replayable log.
//!
//! - **Snapshot** (`snapshot.rs`): versioned JSON persistence with atomic
//!   replace and invariant checks on load.
//!
//! - **Read path** (`read.rs`): reader classes and filtered record views.
//!
//! ## Metrics
//!
//! Counters are emitted through the `metrics` facade and are no-ops unless
//! the host process installs a recorder:
//! `sealreg_records_created_total`, `sealreg_records_finalized_total`,
//! `sealreg_rejections_total{reason}`, `sealreg_snapshot_failures_total`.

pub mod error;
pub mod event;
pub mod read;
pub mod registry;
pub mod snapshot;
pub mod store;

pub use error::RegistryError;
pub use event::{EventBus, EventKind, RegistryEvent};
pub use read::{Reader, RecordView};
pub use registry::{NewRecord, Registry, RegistryConfig};
pub use snapshot::{Snapshot, SnapshotWriter, SNAPSHOT_VERSION};
pub use store::{InMemoryRecordStore, RecordCounts, RecordStore, Staged, StoreConflict};
