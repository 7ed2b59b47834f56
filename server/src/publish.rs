//! Notification sink for session state changes.
//!
//! The engine emits an event through the [`Publisher`] port after every
//! successful mutation. Delivery is best-effort and at-most-once: publishing
//! to a topic nobody listens to drops the event, and a lost delivery never
//! rolls back the state change that produced it.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::protocol::SessionEvent;

/// Buffered events per topic before slow subscribers start losing messages.
const TOPIC_CAPACITY: usize = 64;

/// Topic carrying live snapshots for a session.
pub fn stats_topic(session_id: &str) -> String {
    format!("session/{session_id}/stats")
}

/// Topic carrying revealed tallies for a session.
pub fn result_topic(session_id: &str) -> String {
    format!("session/{session_id}/result")
}

/// Topic signalling that a session's round was reset.
pub fn reset_topic(session_id: &str) -> String {
    format!("session/{session_id}/reset")
}

/// One-way output port for session notifications.
///
/// Implementations must not block the caller and must not surface delivery
/// failures back into the engine.
pub trait Publisher: Send + Sync + 'static {
    fn publish(&self, topic: &str, event: SessionEvent);
}

/// In-process publisher backed by one broadcast channel per topic.
///
/// Subscribing creates the topic channel on first use; publishing to a topic
/// without subscribers is a no-op.
#[derive(Default)]
pub struct EventBus {
    topics: DashMap<String, broadcast::Sender<SessionEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating its channel on first use.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<SessionEvent> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Drop topic channels that have lost all their subscribers. Called from
    /// the periodic sweep so channels of expired sessions do not accumulate.
    pub fn prune(&self) {
        self.topics.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Publisher for EventBus {
    fn publish(&self, topic: &str, event: SessionEvent) {
        if let Some(tx) = self.topics.get(topic) {
            // send only fails when every receiver is gone; the event is lost
            let _ = tx.send(event);
        }
    }
}
