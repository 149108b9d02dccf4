//! # sealreg-state — Records and Their State Machines
//!
//! ## State Machines
//!
//! - **Record** (`record.rs`): `Pending → Finalized`, exactly once. The
//!   disclosed value and finalization time live inside the `Finalized`
//!   variant, so "value present iff finalized" holds by construction.
//!
//! - **Disclosure phase** (`disclosure.rs`): the in-flight view of one
//!   disclosure attempt, `Pending → AwaitingProof → Finalized`, with
//!   `AwaitingProof → Pending` on a rejected proof or an abandoned attempt.
//!   Never persisted.
//!
//! - **Metadata** (`metadata.rs`): immutable public attributes, validated at
//!   construction, and the reader classes that filter them.

pub mod disclosure;
pub mod metadata;
pub mod record;

pub use disclosure::{DisclosureEvent, DisclosurePhase, PhaseError};
pub use metadata::{MetadataError, PublicMetadata, ReaderClass, RESTRICTED_PREFIX};
pub use record::{Record, RecordError, RecordState, RecordStatus};
