//! Redis-backed cache client.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::observability::metrics;

/// Expiry applied by [`CacheClient::set`] when none is given.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SCAN_COUNT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
}

pub struct CacheClient {
    url: String,
    conn: ArcSwapOption<MultiplexedConnection>,
}

impl CacheClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: ArcSwapOption::empty(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.load().is_some()
    }

    /// Connect and verify with `PING`. Failures are logged and leave the
    /// client unset.
    pub async fn start(&self) {
        match self.connect().await {
            Ok(conn) => {
                self.conn.store(Some(Arc::new(conn)));
                tracing::info!("Redis Cache connected.");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to Redis");
            }
        }
        metrics::record_dependency("redis", self.is_connected());
    }

    async fn connect(&self) -> Result<MultiplexedConnection, CacheError> {
        let client = redis::Client::open(self.url.as_str())?;
        let mut conn = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Timeout(CONNECT_TIMEOUT))??;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(conn)
    }

    pub async fn stop(&self) {
        if self.conn.swap(None).is_some() {
            tracing::info!("Redis Cache disconnected.");
        }
        metrics::record_dependency("redis", false);
    }

    fn connection(&self) -> Option<MultiplexedConnection> {
        self.conn.load_full().map(|conn| (*conn).clone())
    }

    /// Fetch and decode a JSON value. `None` when unset, missing or on error.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection()?;
        let result: Result<Option<T>, CacheError> = async {
            let raw: Option<String> = conn.get(key).await?;
            match raw {
                Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
                _ => Ok(None),
            }
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(key, error = %e, "Cache GET error");
            None
        })
    }

    /// Store `value` as JSON with an expiry (default [`DEFAULT_TTL`]).
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let Some(mut conn) = self.connection() else {
            return;
        };
        let ttl = ttl.unwrap_or(DEFAULT_TTL).as_secs().max(1);

        let result: Result<(), CacheError> = async {
            let json = serde_json::to_string(value)?;
            conn.set_ex::<_, _, ()>(key, json, ttl).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => tracing::debug!(key, ttl, "SETEX"),
            Err(e) => tracing::error!(key, error = %e, "Cache SET error"),
        }
    }

    /// Delete every key matching a glob `pattern`.
    ///
    /// Keys are collected with `SCAN` so the server is never blocked, then
    /// removed with a single `DEL`. Returns the number of keys deleted.
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        let Some(mut conn) = self.connection() else {
            return 0;
        };

        let result: Result<usize, CacheError> = async {
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query_async(&mut conn)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }

            if keys.is_empty() {
                return Ok(0);
            }
            keys.sort_unstable();
            keys.dedup();
            let deleted: usize = conn.del(&keys).await?;
            Ok(deleted)
        }
        .await;

        match result {
            Ok(0) => 0,
            Ok(deleted) => {
                tracing::info!(pattern, deleted, "Invalidated cache keys pattern");
                deleted
            }
            Err(e) => {
                tracing::error!(pattern, error = %e, "Cache invalidation error");
                0
            }
        }
    }
}
