//! # Disclosure Verification Flow
//!
//! ```text
//! registry.get(id) ── Finalized ──▶ AlreadyFinalized(stored)      (no capability call)
//!        │ Pending
//!        ▼
//! capability.request_disclosure(handle)   ← suspends; drop = stay Pending
//!        ▼
//! capability.verify(handle, value, proof) ── false ──▶ ProofInvalid, Pending
//!        ▼
//! registry.finalize(id, value, proof) ── AlreadyFinalized ──▶ AlreadyFinalized(stored)
//!        ▼
//! Finalized(value)
//! ```
//!
//! The registry re-reads the handle from its own record in `finalize`. The
//! handle read in step one is used only to ask the capability.

use std::sync::Arc;

use sealreg_core::{Identity, RecordId};
use sealreg_fhe::{ClearValue, EncryptedValueCapability, Requester};
use sealreg_registry::{Registry, RegistryError};
use sealreg_state::DisclosurePhase;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::tracker::PhaseTracker;

/// How a disclosure attempt ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisclosureOutcome {
    /// This attempt performed the transition.
    Finalized(ClearValue),
    /// The record was already finalized; carries the stored value.
    AlreadyFinalized(ClearValue),
}

impl DisclosureOutcome {
    /// The record's disclosed value either way.
    pub fn value(&self) -> ClearValue {
        match self {
            Self::Finalized(v) | Self::AlreadyFinalized(v) => *v,
        }
    }

    /// Whether this attempt performed the transition.
    pub fn is_winner(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }
}

/// Drives disclosures against one registry and capability.
pub struct DisclosureFlow {
    registry: Arc<Registry>,
    capability: Arc<dyn EncryptedValueCapability>,
    phases: PhaseTracker,
}

impl DisclosureFlow {
    /// Flow over `registry` using `capability` for disclosure.
    pub fn new(registry: Arc<Registry>, capability: Arc<dyn EncryptedValueCapability>) -> Self {
        Self {
            registry,
            capability,
            phases: PhaseTracker::new(),
        }
    }

    /// Current phase of `id`. The registry's state wins over the tracker.
    pub fn phase(&self, id: &RecordId) -> Result<DisclosurePhase, ProtocolError> {
        let record = self.registry.get(id)?;
        if record.is_finalized() {
            return Ok(DisclosurePhase::Finalized);
        }
        Ok(self.phases.phase(id))
    }

    /// Number of records with disclosure attempts in flight.
    pub fn in_flight_records(&self) -> usize {
        self.phases.tracked()
    }

    /// Disclose and finalize `id` on behalf of `requester`.
    ///
    /// # Errors
    ///
    /// `Registry(NotFound)`, `Capability(..)` when the capability refuses or
    /// fails, `ProofInvalid` when the proof fails the local or registry
    /// check. In every error case the record stays `Pending`.
    pub async fn disclose(
        &self,
        id: &RecordId,
        requester: &Identity,
    ) -> Result<DisclosureOutcome, ProtocolError> {
        let record = self.registry.get(id)?;
        if let Some(stored) = record.disclosed_value() {
            metrics::counter!("sealreg_disclosures_total", "outcome" => "already_finalized")
                .increment(1);
            return Ok(DisclosureOutcome::AlreadyFinalized(stored));
        }

        let attempt = self.phases.begin(id);
        let handle = *record.encrypted_field();
        tracing::debug!(record_id = %id, handle = %handle.short(), "requesting disclosure");

        let disclosure = self
            .capability
            .request_disclosure(&handle, &Requester::Identity(requester.clone()))
            .await
            .map_err(|e| {
                tracing::warn!(record_id = %id, error = %e, "disclosure request failed");
                metrics::counter!("sealreg_disclosures_total", "outcome" => "capability_error")
                    .increment(1);
                ProtocolError::Capability(e)
            })?;

        if !self
            .capability
            .verify(&handle, disclosure.value, &disclosure.proof)
        {
            attempt.reject();
            tracing::warn!(record_id = %id, "disclosure proof failed pre-check");
            metrics::counter!("sealreg_disclosures_total", "outcome" => "proof_invalid")
                .increment(1);
            return Err(ProtocolError::ProofInvalid {
                id: id.clone(),
                reason: "proof does not verify against the designated authority".to_string(),
            });
        }

        match self
            .registry
            .finalize(id, disclosure.value, &disclosure.proof)
        {
            Ok(_) => {
                attempt.accept();
                metrics::counter!("sealreg_disclosures_total", "outcome" => "finalized")
                    .increment(1);
                Ok(DisclosureOutcome::Finalized(disclosure.value))
            }
            Err(RegistryError::AlreadyFinalized { value, .. }) => {
                attempt.found_finalized();
                metrics::counter!("sealreg_disclosures_total", "outcome" => "already_finalized")
                    .increment(1);
                Ok(DisclosureOutcome::AlreadyFinalized(value))
            }
            Err(e) => {
                attempt.reject();
                metrics::counter!("sealreg_disclosures_total", "outcome" => e.reason())
                    .increment(1);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_value_and_winner() {
        assert_eq!(DisclosureOutcome::Finalized(ClearValue::from(3)).value().get(), 3);
        assert!(DisclosureOutcome::Finalized(ClearValue::from(3)).is_winner());
        assert!(!DisclosureOutcome::AlreadyFinalized(ClearValue::from(3)).is_winner());
    }

    #[test]
    fn outcome_wire_shape() {
        let json = serde_json::to_value(DisclosureOutcome::AlreadyFinalized(ClearValue::from(138)))
            .unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "ALREADY_FINALIZED", "value": 138}));
    }
}
