//! # Registry Notifications
//!
//! Every accepted mutation produces exactly one [`RegistryEvent`]. Sequence
//! numbers are assigned while the store's write lock is held, so ascending
//! sequence order is the order in which mutations took effect. In
//! particular `Disclosed(id)` always follows `RecordCreated(id)`.
//!
//! Events fan out on a `tokio::sync::broadcast` channel and are kept in an
//! append-only in-memory log for replay by late subscribers.

use parking_lot::RwLock;
use sealreg_core::{Identity, RecordId, Timestamp};
use sealreg_fhe::ClearValue;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Lagging receivers can catch up from
/// the log with [`EventBus::since`].
pub const CHANNEL_CAPACITY: usize = 1024;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum EventKind {
    /// A record was inserted in `Pending`.
    RecordCreated {
        /// Record identifier.
        id: RecordId,
        /// Owner of the record.
        owner: Identity,
    },
    /// A record transitioned to `Finalized`.
    Disclosed {
        /// Record identifier.
        id: RecordId,
        /// Verified disclosed value.
        disclosed_value: ClearValue,
    },
}

impl EventKind {
    /// Record the event concerns.
    pub fn record_id(&self) -> &RecordId {
        match self {
            Self::RecordCreated { id, .. } | Self::Disclosed { id, .. } => id,
        }
    }
}

/// A sequenced notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Position in the registry's linearization order, starting at 1.
    pub sequence: u64,
    /// When the mutation was accepted.
    pub at: Timestamp,
    /// The mutation.
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Default)]
struct EventLog {
    next: u64,
    entries: Vec<RegistryEvent>,
}

/// Publisher, log and subscription point for registry events.
#[derive(Debug)]
pub struct EventBus {
    log: RwLock<EventLog>,
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    /// Empty bus whose first event gets sequence `after + 1`.
    pub fn starting_after(after: u64) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            log: RwLock::new(EventLog {
                next: after + 1,
                entries: Vec::new(),
            }),
            sender,
        }
    }

    /// Assign the next sequence number, append and broadcast.
    ///
    /// Call only while holding the store's write lock.
    pub(crate) fn publish(&self, kind: EventKind, at: Timestamp) -> RegistryEvent {
        let event = {
            let mut log = self.log.write();
            let event = RegistryEvent {
                sequence: log.next,
                at,
                kind,
            };
            log.next += 1;
            log.entries.push(event.clone());
            event
        };
        // No receivers is not an error.
        let _ = self.sender.send(event.clone());
        event
    }

    /// Live subscription to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    /// Logged events with `sequence > after`, in order.
    pub fn since(&self, after: u64) -> Vec<RegistryEvent> {
        let log = self.log.read();
        let start = log.entries.partition_point(|e| e.sequence <= after);
        log.entries[start..].to_vec()
    }

    /// Sequence number of the latest event, or the starting offset.
    pub fn last_sequence(&self) -> u64 {
        self.log.read().next - 1
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::starting_after(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: &str) -> EventKind {
        EventKind::RecordCreated {
            id: RecordId::new(id).unwrap(),
            owner: Identity::new("0xAA").unwrap(),
        }
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let bus = EventBus::default();
        assert_eq!(bus.last_sequence(), 0);
        let a = bus.publish(created("a"), Timestamp::now());
        let b = bus.publish(created("b"), Timestamp::now());
        assert_eq!((a.sequence, b.sequence), (1, 2));
        assert_eq!(bus.last_sequence(), 2);
    }

    #[test]
    fn since_replays_suffix() {
        let bus = EventBus::default();
        for id in ["a", "b", "c"] {
            bus.publish(created(id), Timestamp::now());
        }
        let tail = bus.since(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].kind.record_id().as_str(), "b");
        assert!(bus.since(3).is_empty());
        assert_eq!(bus.since(0).len(), 3);
    }

    #[test]
    fn resumes_after_offset() {
        let bus = EventBus::starting_after(41);
        assert_eq!(bus.publish(created("a"), Timestamp::now()).sequence, 42);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(created("a"), Timestamp::now());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.sequence, 1);
    }

    #[test]
    fn wire_shape() {
        let bus = EventBus::default();
        let e = bus.publish(
            EventKind::Disclosed {
                id: RecordId::new("rec-1").unwrap(),
                disclosed_value: ClearValue::from(138),
            },
            Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
        );
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "Disclosed");
        assert_eq!(json["id"], "rec-1");
        assert_eq!(json["disclosedValue"], 138);
        assert_eq!(json["sequence"], 1);
    }
}
