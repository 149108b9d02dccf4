//! # Record Lifecycle
//!
//! ```text
//! Pending ──finalize(value)──▶ Finalized { value, finalized_at }   (terminal)
//! ```
//!
//! `id`, `owner`, `encrypted_field`, `public_metadata` and `created_at` are
//! private and set only by [`Record::new`]. The only mutation is
//! [`Record::finalize`], which succeeds once.
//!
//! ## Serialized Form
//!
//! Records persist in a flat camelCase shape with `state`, `disclosedValue`
//! and `finalizedAt` as separate fields. Deserialization rejects any
//! combination where the value is present without `FINALIZED` or the other
//! way round.

use sealreg_core::{Identity, RecordId, Timestamp};
use sealreg_fhe::{ClearValue, Handle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::PublicMetadata;

/// Errors from record transitions and record validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Finalize on a record that is already finalized.
    #[error("record {id} is already finalized")]
    AlreadyFinalized {
        /// Record identifier.
        id: RecordId,
        /// The value stored by the first finalize.
        value: ClearValue,
    },

    /// A serialized record violates a record invariant.
    #[error("record {id} is inconsistent: {reason}")]
    Inconsistent {
        /// Record identifier.
        id: String,
        /// Violated invariant.
        reason: String,
    },
}

/// Name-only view of the state, used in events, logs and API views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    /// Created, value not yet disclosed.
    Pending,
    /// Value disclosed and verified.
    Finalized,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Finalized => "FINALIZED",
        })
    }
}

/// Processing state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Awaiting disclosure.
    Pending,
    /// Disclosed; terminal.
    Finalized {
        /// The verified disclosed value.
        value: ClearValue,
        /// When the transition was accepted.
        finalized_at: Timestamp,
    },
}

impl RecordState {
    /// Name-only status.
    pub fn status(&self) -> RecordStatus {
        match self {
            Self::Pending => RecordStatus::Pending,
            Self::Finalized { .. } => RecordStatus::Finalized,
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized { .. })
    }
}

/// A registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr", into = "RecordRepr")]
pub struct Record {
    id: RecordId,
    owner: Identity,
    encrypted_field: Handle,
    public_metadata: PublicMetadata,
    state: RecordState,
    created_at: Timestamp,
}

impl Record {
    /// A fresh `Pending` record.
    pub fn new(
        id: RecordId,
        owner: Identity,
        encrypted_field: Handle,
        public_metadata: PublicMetadata,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            encrypted_field,
            public_metadata,
            state: RecordState::Pending,
            created_at,
        }
    }

    /// Record identifier.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Creator and owner.
    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Opaque handle of the confidential field.
    pub fn encrypted_field(&self) -> &Handle {
        &self.encrypted_field
    }

    /// Public attributes, unfiltered.
    pub fn public_metadata(&self) -> &PublicMetadata {
        &self.public_metadata
    }

    /// Current state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Name-only status.
    pub fn status(&self) -> RecordStatus {
        self.state.status()
    }

    /// Creation time.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Disclosed value; `Some` iff finalized.
    pub fn disclosed_value(&self) -> Option<ClearValue> {
        match self.state {
            RecordState::Finalized { value, .. } => Some(value),
            RecordState::Pending => None,
        }
    }

    /// Finalization time; `Some` iff finalized.
    pub fn finalized_at(&self) -> Option<Timestamp> {
        match self.state {
            RecordState::Finalized { finalized_at, .. } => Some(finalized_at),
            RecordState::Pending => None,
        }
    }

    /// Whether the record is finalized.
    pub fn is_finalized(&self) -> bool {
        self.state.is_terminal()
    }

    /// Pending → Finalized. A second call fails and leaves the record as it
    /// was, reporting the value stored by the first.
    pub fn finalize(&mut self, value: ClearValue, at: Timestamp) -> Result<(), RecordError> {
        if let RecordState::Finalized { value: stored, .. } = self.state {
            return Err(RecordError::AlreadyFinalized {
                id: self.id.clone(),
                value: stored,
            });
        }
        // Clocks may step backwards between create and finalize.
        let finalized_at = at.max(self.created_at);
        self.state = RecordState::Finalized {
            value,
            finalized_at,
        };
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RecordRepr {
    id: RecordId,
    owner: Identity,
    encrypted_field: Handle,
    #[serde(default)]
    public_metadata: PublicMetadata,
    state: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disclosed_value: Option<ClearValue>,
    created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finalized_at: Option<Timestamp>,
}

impl From<Record> for RecordRepr {
    fn from(r: Record) -> Self {
        let disclosed_value = r.disclosed_value();
        let finalized_at = r.finalized_at();
        Self {
            id: r.id,
            owner: r.owner,
            encrypted_field: r.encrypted_field,
            public_metadata: r.public_metadata,
            state: r.state.status(),
            disclosed_value,
            created_at: r.created_at,
            finalized_at,
        }
    }
}

impl TryFrom<RecordRepr> for Record {
    type Error = RecordError;

    fn try_from(r: RecordRepr) -> Result<Self, Self::Error> {
        let inconsistent = |reason: &str| RecordError::Inconsistent {
            id: r.id.to_string(),
            reason: reason.to_string(),
        };
        if !r.encrypted_field.is_well_formed() {
            return Err(inconsistent("encrypted field is the zero handle"));
        }
        let state = match (r.state, r.disclosed_value, r.finalized_at) {
            (RecordStatus::Pending, None, None) => RecordState::Pending,
            (RecordStatus::Finalized, Some(value), Some(finalized_at)) => {
                if finalized_at < r.created_at {
                    return Err(inconsistent("finalizedAt precedes createdAt"));
                }
                RecordState::Finalized {
                    value,
                    finalized_at,
                }
            }
            (RecordStatus::Pending, _, _) => {
                return Err(inconsistent("pending record carries disclosure fields"));
            }
            (RecordStatus::Finalized, _, _) => {
                return Err(inconsistent("finalized record lacks disclosure fields"));
            }
        };
        Ok(Self {
            id: r.id,
            owner: r.owner,
            encrypted_field: r.encrypted_field,
            public_metadata: r.public_metadata,
            state,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> Record {
        Record::new(
            RecordId::new("rec-1").unwrap(),
            Identity::new("0xAA").unwrap(),
            Handle::from_bytes([7u8; 32]),
            PublicMetadata::from_pairs([("category", "loan")]).unwrap(),
            Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
        )
    }

    #[test]
    fn new_record_is_pending_without_value() {
        let r = make_record();
        assert_eq!(r.status(), RecordStatus::Pending);
        assert_eq!(r.disclosed_value(), None);
        assert_eq!(r.finalized_at(), None);
    }

    #[test]
    fn finalize_once() {
        let mut r = make_record();
        let at = Timestamp::parse("2026-01-15T12:05:00Z").unwrap();
        r.finalize(ClearValue::from(138), at).unwrap();
        assert!(r.is_finalized());
        assert_eq!(r.disclosed_value(), Some(ClearValue::from(138)));
        assert_eq!(r.finalized_at(), Some(at));
    }

    #[test]
    fn second_finalize_rejected_and_value_kept() {
        let mut r = make_record();
        r.finalize(ClearValue::from(138), Timestamp::now()).unwrap();
        let before = r.clone();
        let err = r.finalize(ClearValue::from(1), Timestamp::now()).unwrap_err();
        assert_eq!(
            err,
            RecordError::AlreadyFinalized {
                id: RecordId::new("rec-1").unwrap(),
                value: ClearValue::from(138),
            }
        );
        assert_eq!(r, before);
    }

    #[test]
    fn finalized_at_never_precedes_created_at() {
        let mut r = make_record();
        r.finalize(
            ClearValue::from(1),
            Timestamp::parse("2020-01-01T00:00:00Z").unwrap(),
        )
        .unwrap();
        assert_eq!(r.finalized_at(), Some(r.created_at()));
    }

    #[test]
    fn serialized_form_is_flat_camel_case() {
        let mut r = make_record();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["state"], "PENDING");
        assert!(json.get("disclosedValue").is_none());
        assert_eq!(json["encryptedField"], "07".repeat(32));

        r.finalize(ClearValue::from(138), Timestamp::now()).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["state"], "FINALIZED");
        assert_eq!(json["disclosedValue"], 138);
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn deserialize_rejects_value_on_pending() {
        let mut json = serde_json::to_value(make_record()).unwrap();
        json["disclosedValue"] = serde_json::json!(5);
        let err = serde_json::from_value::<Record>(json).unwrap_err();
        assert!(err.to_string().contains("pending record carries disclosure fields"));
    }

    #[test]
    fn deserialize_rejects_finalized_without_value() {
        let mut json = serde_json::to_value(make_record()).unwrap();
        json["state"] = serde_json::json!("FINALIZED");
        assert!(serde_json::from_value::<Record>(json).is_err());
    }
}
