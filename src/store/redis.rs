//! Redis-backed counters shared by every gateway instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::OnceCell;

use super::{CounterStore, StoreError};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Counter store on a multiplexed, auto-reconnecting Redis connection.
///
/// The connection is established on first use so a cache outage at boot
/// does not keep the gateway from starting.
pub struct RedisCounterStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCounterStore {
    /// Parse the URL without connecting.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tracing::info!("Connecting to Redis counter store");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;
        // Clones share the underlying multiplexed connection.
        Ok(manager.clone())
    }
}

/// `MULTI / SET key 0 PX <window> NX / INCR key / EXEC`.
///
/// The SET only creates a missing key, so the TTL is attached once and the
/// window stays anchored at first use.
fn increment_pipeline(key: &str, window: Duration) -> redis::Pipeline {
    let window_ms = window.as_millis().max(1) as u64;
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("PX")
        .arg(window_ms)
        .arg("NX")
        .ignore()
        .incr(key, 1);
    pipe
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn current(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let count: Option<u64> = conn.get(key).await?;
        Ok(count.unwrap_or(0))
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let (count,): (u64,) = increment_pipeline(key, window)
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }
}
