use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::session::{Session, SessionError, SessionStore};

/// Process-local store. Used when no `REDIS_URL` is configured.
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, (Session, Instant)>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn is_expired(&self, stored_at: Instant) -> bool {
        stored_at.elapsed() >= self.ttl
    }

    fn purge_expired(&self, sessions: &mut HashMap<Uuid, (Session, Instant)>) {
        sessions.retain(|_, (_, stored_at)| !self.is_expired(*stored_at));
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                None => return Ok(None),
                Some((session, stored_at)) if !self.is_expired(*stored_at) => {
                    return Ok(Some(session.clone()))
                }
                Some(_) => {}
            }
        }

        // Expired: purge everything past its TTL while we hold the write lock.
        let mut sessions = self.sessions.write().await;
        self.purge_expired(&mut sessions);
        Ok(None)
    }

    async fn put(&self, session: &Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        self.purge_expired(&mut sessions);
        sessions.insert(session.id, (session.clone(), Instant::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::entity::EntityCandidates;

    fn session() -> Session {
        Session::new("Agilent".to_string(), None, EntityCandidates::default())
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let session = session();
        store.put(&session).await.unwrap();

        let loaded = store.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.company, "Agilent");
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_purged() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let old = session();
        store.put(&old).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = session();
        store.put(&fresh).await.unwrap();

        assert!(store.get(old.id).await.unwrap().is_none());
        assert!(store.get(fresh.id).await.unwrap().is_some());
        assert_eq!(store.sessions.read().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_sessions_are_evicted_on_put() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        for _ in 0..1000 {
            store.put(&session()).await.unwrap();
            tokio::time::advance(Duration::from_secs(120)).await;
        }

        assert_eq!(store.sessions.read().await.len(), 1);
        store.put(&session()).await.unwrap();
        assert_eq!(store.sessions.read().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_resets_ttl() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let mut session = session();
        store.put(&session).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        session.business_unit = Some("CrossLab".to_string());
        store.put(&session).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        let loaded = store.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.business_unit.as_deref(), Some("CrossLab"));
    }
}
