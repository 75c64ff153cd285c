//! Direct Redis counter store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, RedisError, Script, aio::ConnectionManager};
use tracing::instrument;

use crate::store::{INCREMENT_SCRIPT, Increment, RateLimitStore, StoreError, increment_from_reply};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    script: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal()
        {
            Self::Unavailable(e.to_string())
        } else {
            Self::Protocol(e.to_string())
        }
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the connection is not established within
    /// `connect_timeout`.
    pub async fn connect(redis_url: &str, connect_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)?;
        let conn = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Unavailable("connection timed out".to_string()))??;

        Ok(Self {
            conn,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    #[instrument(skip(self), fields(store.operation = "EVALSHA"))]
    async fn increment(&self, key: &str, window: Duration) -> Result<Increment, StoreError> {
        let mut conn = self.conn.clone();
        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(key)
            .arg(window.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;

        increment_from_reply(count, ttl_ms, window)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
