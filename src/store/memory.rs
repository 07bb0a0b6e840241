//! Process-local counters.
//!
//! Suitable for a single gateway instance and for tests. Entries expire
//! lazily on access; `spawn_sweeper` purges abandoned keys periodically.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{CounterStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

/// In-memory counter store.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired counter. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.expires_at > now);
        before - self.counters.len()
    }

    /// Number of tracked keys, expired or not.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Periodically purge expired counters.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = self.purge_expired();
                if removed > 0 {
                    tracing::trace!(removed, "Purged expired rate limit counters");
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn current(&self, key: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|counter| counter.expires_at > now)
            .map(|counter| counter.count)
            .unwrap_or(0))
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + window,
        });
        if counter.expires_at <= now {
            *counter = Counter {
                count: 0,
                expires_at: now + window,
            };
        }
        counter.count += 1;
        Ok(counter.count)
    }
}
