//! # Disclosure Phase Tracking
//!
//! Every disclosure attempt holds an [`AttemptGuard`]. While at least one
//! guard for a record is live the record reads `AwaitingProof`. A guard that
//! is dropped without being resolved counts as abandoned, which is how a
//! cancelled disclosure future returns the record to `Pending`.
//!
//! Only records with live attempts are tracked. An entry is dropped once
//! its last attempt resolves, whether that leaves the record `Pending` or
//! `Finalized`; finality itself is read from the registry.
//!
//! Nothing here is persisted. After a restart every unfinalized record is
//! `Pending` again, which is the correct state for an attempt that never
//! reached the registry.

use std::collections::HashMap;

use parking_lot::Mutex;
use sealreg_core::RecordId;
use sealreg_state::{DisclosureEvent, DisclosurePhase};

#[derive(Debug, Clone, Copy)]
struct Entry {
    phase: DisclosurePhase,
    in_flight: usize,
}

/// Per-record disclosure phases.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    entries: Mutex<HashMap<RecordId, Entry>>,
}

impl PhaseTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracked phase of `id`. Untracked records are `Pending` as far as the
    /// tracker knows.
    pub fn phase(&self, id: &RecordId) -> DisclosurePhase {
        self.entries
            .lock()
            .get(id)
            .map(|e| e.phase)
            .unwrap_or(DisclosurePhase::Pending)
    }

    /// Number of unresolved attempts for `id`.
    pub fn in_flight(&self, id: &RecordId) -> usize {
        self.entries.lock().get(id).map(|e| e.in_flight).unwrap_or(0)
    }

    /// Number of records with tracked state.
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }

    /// Start an attempt for `id`.
    pub fn begin(&self, id: &RecordId) -> AttemptGuard<'_> {
        self.apply(id, DisclosureEvent::Requested, false);
        AttemptGuard {
            tracker: self,
            id: id.clone(),
            resolved: false,
        }
    }

    /// Apply `event`; `release` ends one in-flight attempt.
    fn apply(&self, id: &RecordId, event: DisclosureEvent, release: bool) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(id.clone()).or_insert(Entry {
            phase: DisclosurePhase::Pending,
            in_flight: 0,
        });

        if event == DisclosureEvent::Requested {
            entry.in_flight += 1;
        }
        if release {
            entry.in_flight = entry.in_flight.saturating_sub(1);
        }

        // A rejection only returns to Pending once no other attempt is live.
        let holds = matches!(
            event,
            DisclosureEvent::ProofRejected | DisclosureEvent::Abandoned
        ) && entry.in_flight > 0;

        if !holds {
            match entry.phase.transition(event) {
                Ok(next) => entry.phase = next,
                Err(e) => tracing::debug!(record_id = %id, error = %e, "phase unchanged"),
            }
        }

        if entry.in_flight == 0 {
            entries.remove(id);
        }
    }
}

/// One live disclosure attempt. Resolve it with [`accept`](Self::accept),
/// [`reject`](Self::reject) or [`found_finalized`](Self::found_finalized);
/// dropping it unresolved abandons the attempt.
#[derive(Debug)]
pub struct AttemptGuard<'a> {
    tracker: &'a PhaseTracker,
    id: RecordId,
    resolved: bool,
}

impl AttemptGuard<'_> {
    /// The registry accepted the proof.
    pub fn accept(mut self) {
        self.resolve(DisclosureEvent::ProofAccepted);
    }

    /// The proof failed verification.
    pub fn reject(mut self) {
        self.resolve(DisclosureEvent::ProofRejected);
    }

    /// Another attempt finalized the record first.
    pub fn found_finalized(mut self) {
        self.resolve(DisclosureEvent::FoundFinalized);
    }

    fn resolve(&mut self, event: DisclosureEvent) {
        self.resolved = true;
        self.tracker.apply(&self.id, event, true);
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::debug!(record_id = %self.id, "disclosure attempt abandoned");
            self.tracker.apply(&self.id, DisclosureEvent::Abandoned, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> RecordId {
        RecordId::new("rec-1").unwrap()
    }

    #[test]
    fn untracked_is_pending() {
        let t = PhaseTracker::new();
        assert_eq!(t.phase(&id()), DisclosurePhase::Pending);
    }

    #[test]
    fn guard_sets_awaiting_and_drop_restores_pending() {
        let t = PhaseTracker::new();
        {
            let _g = t.begin(&id());
            assert_eq!(t.phase(&id()), DisclosurePhase::AwaitingProof);
            assert_eq!(t.in_flight(&id()), 1);
        }
        assert_eq!(t.phase(&id()), DisclosurePhase::Pending);
        assert_eq!(t.in_flight(&id()), 0);
    }

    #[test]
    fn accept_releases_entry() {
        let t = PhaseTracker::new();
        t.begin(&id()).accept();
        assert_eq!(t.tracked(), 0);
    }

    #[test]
    fn reject_with_other_attempt_live_stays_awaiting() {
        let t = PhaseTracker::new();
        let a = t.begin(&id());
        let b = t.begin(&id());
        a.reject();
        assert_eq!(t.phase(&id()), DisclosurePhase::AwaitingProof);
        b.reject();
        assert_eq!(t.phase(&id()), DisclosurePhase::Pending);
    }

    #[test]
    fn finalized_survives_later_abandon() {
        let t = PhaseTracker::new();
        let a = t.begin(&id());
        let b = t.begin(&id());
        a.accept();
        assert_eq!(t.phase(&id()), DisclosurePhase::Finalized);
        drop(b);
        assert_eq!(t.in_flight(&id()), 0);
        assert_eq!(t.tracked(), 0);
    }

    #[test]
    fn many_finalized_records_leave_nothing_behind() {
        let t = PhaseTracker::new();
        for i in 0..100 {
            let id = RecordId::new(format!("rec-{i}")).unwrap();
            let guard = t.begin(&id);
            if i % 2 == 0 {
                guard.accept();
            } else {
                guard.found_finalized();
            }
        }
        assert_eq!(t.tracked(), 0);
    }

    #[test]
    fn found_finalized_releases_slot() {
        let t = PhaseTracker::new();
        t.begin(&id()).found_finalized();
        assert_eq!(t.in_flight(&id()), 0);
        assert_eq!(t.tracked(), 0);
    }
}
