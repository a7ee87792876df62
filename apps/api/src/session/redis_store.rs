use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client as RedisClient;
use tracing::debug;
use uuid::Uuid;

use crate::session::{Session, SessionError, SessionStore};

const KEY_PREFIX: &str = "analyst:session:";

/// Sessions as JSON strings with a Redis-side expiry, shared across replicas.
///
/// One multiplexed connection is shared by all requests; `ConnectionManager`
/// reconnects on its own after the server drops it.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisSessionStore {
    /// Connects eagerly so a bad `REDIS_URL` fails at startup.
    pub async fn connect(client: RedisClient, ttl: Duration) -> Result<Self, SessionError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl })
    }
}

fn session_key(id: Uuid) -> String {
    format!("{KEY_PREFIX}{id}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(id))
            .query_async(&mut conn)
            .await?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(SessionError::from)
    }

    async fn put(&self, session: &Session) -> Result<(), SessionError> {
        let json = serde_json::to_string(session)?;
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(session_key(session.id))
            .arg(json)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;

        debug!(session_id = %session.id, "Session stored in Redis");
        Ok(())
    }
}
