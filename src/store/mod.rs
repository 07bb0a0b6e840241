//! Rate-limit counter stores.
//!
//! # Data Flow
//! ```text
//! RateLimiter
//!     → CounterStore::current(key)          (read)
//!     → CounterStore::increment(key, window) (atomic incr + TTL on create)
//!         → redis.rs  (shared Redis, MULTI/EXEC pipeline)
//!         → memory.rs (process-local DashMap)
//! ```
//!
//! # Design Decisions
//! - Counters are the only cross-request mutable state in the gateway
//! - The TTL is applied only when a key is created: fixed windows
//! - Stores report failures; the limiter decides to fail open

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;

/// Counter store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("counter store did not answer within {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Timeout(_) => "timeout",
        }
    }
}

/// Fixed-window request counters keyed by client.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current count for `key` in its window; zero when absent or expired.
    async fn current(&self, key: &str) -> Result<u64, StoreError>;

    /// Atomically increment `key`, starting a `window`-long TTL if the key
    /// is new. Returns the count after the increment.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError>;
}
