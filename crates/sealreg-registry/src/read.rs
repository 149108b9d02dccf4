//! # Read Path
//!
//! Non-mutating views of records, with public metadata filtered by the
//! reader's class. The handle and the disclosed value are not gated here;
//! the handle is opaque and the value only exists once disclosure has been
//! verified.

use std::collections::BTreeMap;

use sealreg_core::{Identity, RecordId, Timestamp};
use sealreg_fhe::{ClearValue, Handle};
use sealreg_state::{ReaderClass, Record, RecordStatus};
use serde::{Deserialize, Serialize};

/// Who is reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reader {
    /// Class claimed by the caller's credentials.
    pub class: ReaderClass,
    /// Authenticated identity, if any.
    pub identity: Option<Identity>,
}

impl Reader {
    /// Anonymous public reader.
    pub fn public() -> Self {
        Self::default()
    }

    /// Reader with full visibility.
    pub fn auditor() -> Self {
        Self {
            class: ReaderClass::Auditor,
            identity: None,
        }
    }

    /// Authenticated reader of the given class.
    pub fn identified(class: ReaderClass, identity: Identity) -> Self {
        Self {
            class,
            identity: Some(identity),
        }
    }

    /// Effective class for `record`. `Owner` applies only when the identity
    /// matches the record's owner; otherwise an owner-class reader is public.
    pub fn class_for(&self, record: &Record) -> ReaderClass {
        match self.class {
            ReaderClass::Auditor => ReaderClass::Auditor,
            _ if self.identity.as_ref() == Some(record.owner()) => ReaderClass::Owner,
            _ => ReaderClass::Public,
        }
    }
}

/// A record as shown to one reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: RecordId,
    pub owner: Identity,
    pub encrypted_field: Handle,
    pub public_metadata: BTreeMap<String, String>,
    pub state: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_value: Option<ClearValue>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<Timestamp>,
    /// Class the metadata was filtered for.
    pub reader_class: ReaderClass,
}

impl RecordView {
    /// Render `record` for `reader`.
    pub fn new(record: &Record, reader: &Reader) -> Self {
        let class = reader.class_for(record);
        Self {
            id: record.id().clone(),
            owner: record.owner().clone(),
            encrypted_field: *record.encrypted_field(),
            public_metadata: record.public_metadata().visible_to(class),
            state: record.status(),
            disclosed_value: record.disclosed_value(),
            created_at: record.created_at(),
            finalized_at: record.finalized_at(),
            reader_class: class,
        }
    }
}
