//! Per-browser session state backed by Redis

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    models::dashboard::SessionData,
};

/// Session backend. Handlers load the state, compute a new one and hand it
/// back; nothing is kept in process memory.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// State of session `id`, or the empty state for unknown/expired sessions
    async fn load(&self, id: &str) -> AppResult<SessionData>;

    /// Persist `data` for session `id`, refreshing its expiry
    async fn save(&self, id: &str, data: &SessionData) -> AppResult<()>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Open the client and check the server answers PING
    pub async fn new(url: &str, ttl_seconds: u64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client, ttl_seconds })
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> AppResult<SessionData> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(Self::key(id))
            .await
            .map_err(|e| AppError::Session(format!("Failed to read session: {}", e)))?;

        match raw {
            Some(json) => serde_json::from_str(&json).or_else(|e| {
                tracing::warn!("Discarding unreadable session {}: {}", id, e);
                Ok(SessionData::default())
            }),
            None => Ok(SessionData::default()),
        }
    }

    async fn save(&self, id: &str, data: &SessionData) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let json = serde_json::to_string(data)
            .map_err(|e| AppError::Internal(format!("Failed to encode session: {}", e)))?;
        conn.set_ex::<_, _, ()>(Self::key(id), json, self.ttl_seconds)
            .await
            .map_err(|e| AppError::Session(format!("Failed to store session: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key() {
        assert_eq!(RedisSessionStore::key("abc"), "session:abc");
    }
}
