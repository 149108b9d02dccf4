//! # Disclosure Phase Machine
//!
//! The per-record view of disclosure attempts:
//!
//! ```text
//! Pending ──Requested──▶ AwaitingProof ──ProofAccepted──▶ Finalized
//!    ▲                        │
//!    └──ProofRejected─────────┤
//!    └──Abandoned─────────────┘
//! ```
//!
//! `Finalized` absorbs everything: a request against a finalized record
//! short-circuits instead of reaching the capability. The phase is held in
//! memory by the protocol layer and is never persisted; the durable truth is
//! the record's own state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a record stands with respect to disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisclosurePhase {
    /// No attempt in flight.
    Pending,
    /// At least one attempt has requested disclosure and not yet resolved.
    AwaitingProof,
    /// The record is finalized.
    Finalized,
}

/// Inputs to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureEvent {
    /// Disclosure requested from the capability.
    Requested,
    /// Registry accepted the proof.
    ProofAccepted,
    /// Proof failed verification, locally or in the registry.
    ProofRejected,
    /// Attempt cancelled or the capability failed.
    Abandoned,
    /// Registry reported the record was already finalized.
    FoundFinalized,
}

/// Rejected phase transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid disclosure transition: {from} on {event:?}")]
pub struct PhaseError {
    /// Phase the machine was in.
    pub from: DisclosurePhase,
    /// Event that does not apply.
    pub event: DisclosureEvent,
}

impl DisclosurePhase {
    /// Whether this phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized)
    }

    /// Apply `event`.
    pub fn transition(self, event: DisclosureEvent) -> Result<Self, PhaseError> {
        use DisclosureEvent as E;
        match (self, event) {
            (_, E::FoundFinalized) => Ok(Self::Finalized),
            (Self::Pending, E::Requested) => Ok(Self::AwaitingProof),
            (Self::AwaitingProof, E::Requested) => Ok(Self::AwaitingProof),
            (Self::AwaitingProof, E::ProofAccepted) => Ok(Self::Finalized),
            (Self::AwaitingProof, E::ProofRejected | E::Abandoned) => Ok(Self::Pending),
            (from, event) => Err(PhaseError { from, event }),
        }
    }
}

impl std::fmt::Display for DisclosurePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::AwaitingProof => "AWAITING_PROOF",
            Self::Finalized => "FINALIZED",
        })
    }
}
