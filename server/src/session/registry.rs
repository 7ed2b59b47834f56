use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use tracing::info;

use crate::publish::Publisher;
use crate::session::state::{Session, SessionId, generate_session_id, now_millis};

/// Owns every live session and evicts the ones nobody has touched for too
/// long. Lookups, creation and the sweep may all run concurrently.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    publisher: Arc<dyn Publisher>,
}

impl SessionRegistry {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            sessions: DashMap::new(),
            publisher,
        }
    }

    /// Create and register a fresh session.
    pub fn create_session(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(generate_session_id(), self.publisher.clone()));
        self.sessions.insert(session.id().clone(), session.clone());
        counter!("scrumpoker_sessions_created_total").increment(1);
        info!("New session created: {}", session.id());
        session
    }

    /// Look up a session. Absence is a normal outcome, not an error: the id
    /// may belong to a session that expired or never existed.
    pub fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Evict every session idle for longer than `ttl`.
    ///
    /// The cutoff is computed once per pass. Candidates come from a traversal
    /// snapshot and are re-checked against the same cutoff at removal, so a
    /// session touched mid-pass survives until the next one. Callers holding
    /// an `Arc` to an evicted session can still finish their operation on it.
    pub fn sweep_expired(&self, ttl: Duration) {
        let cutoff = now_millis().saturating_sub(ttl.as_millis() as u64);
        let old_size = self.sessions.len();

        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().last_activity() < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        for id in expired {
            if self
                .sessions
                .remove_if(&id, |_, session| session.last_activity() < cutoff)
                .is_some()
            {
                info!("Removing expired session: {}", id);
                counter!("scrumpoker_sessions_expired_total").increment(1);
            }
        }

        let remaining = self.sessions.len();
        info!(
            "Expired {} sessions. {} sessions are still active.",
            old_size - remaining,
            remaining
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SessionEvent;

    struct NoopPublisher;

    impl Publisher for NoopPublisher {
        fn publish(&self, _topic: &str, _event: SessionEvent) {}
    }

    fn test_registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(NoopPublisher))
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let registry = test_registry();

        let session = registry.create_session();
        assert_eq!(registry.session_count(), 1);

        let found = registry.get_session(session.id()).expect("session exists");
        assert_eq!(found.id(), session.id());
    }

    #[tokio::test]
    async fn test_get_absent_session_is_none() {
        let registry = test_registry();
        assert!(registry.get_session("nonexistent").is_none());
    }

    #[tokio::test]
    async fn test_sessions_get_distinct_ids() {
        let registry = test_registry();
        let a = registry.create_session();
        let b = registry.create_session();
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.session_count(), 2);
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_sessions() {
        let registry = test_registry();
        let session = registry.create_session();

        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.sweep_expired(Duration::from_millis(1));

        assert_eq!(registry.session_count(), 0);
        assert!(registry.get_session(session.id()).is_none());
    }

    #[tokio::test]
    async fn test_sweep_keeps_active_sessions() {
        let registry = test_registry();
        registry.create_session();

        registry.sweep_expired(Duration::from_secs(60));

        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test]
    async fn test_recent_mutation_defers_eviction() {
        let registry = test_registry();
        let session = registry.create_session();

        tokio::time::sleep(Duration::from_millis(50)).await;
        session.join("Alice").await.unwrap();
        registry.sweep_expired(Duration::from_millis(20));

        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_only_evicts_expired_sessions() {
        let registry = test_registry();
        let idle = registry.create_session();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let fresh = registry.create_session();
        registry.sweep_expired(Duration::from_millis(20));

        assert!(registry.get_session(idle.id()).is_none());
        assert!(registry.get_session(fresh.id()).is_some());
    }

    #[tokio::test]
    async fn test_evicted_session_still_usable_through_live_reference() {
        let registry = test_registry();
        let session = registry.create_session();

        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.sweep_expired(Duration::from_millis(1));

        // the registry no longer knows the session, but an in-flight caller
        // holding it can still complete its operation
        assert!(registry.get_session(session.id()).is_none());
        assert!(session.join("Alice").await.is_ok());
    }
}
