//! Fixed-window rate limiting backed by a shared counter store.
//!
//! # Algorithm
//! 1. Read the client's count for the current window.
//! 2. `count >= limit` → 429 with `X-RateLimit-Remaining: 0`.
//! 3. Otherwise increment (TTL set on creation only) and report
//!    `limit - new_count` remaining.
//!
//! A client may burst up to twice the limit across a window boundary.
//!
//! # Failure Policy
//! Store errors and timeouts allow the request (fail-open) so a cache outage
//! degrades enforcement instead of availability.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use axum::response::{IntoResponse, Response};

use crate::config::RateLimitConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::pipeline::{Next, Stage};
use crate::security::auth::Identity;
use crate::security::client_ip::client_ip;
use crate::store::{CounterStore, StoreError};

pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Within budget.
    Allowed { limit: u64, remaining: u64 },
    /// Budget exhausted for this window.
    Rejected { limit: u64 },
    /// Store unavailable; allowed without enforcement.
    Bypassed,
}

/// Rate limiter shared by all request tasks.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window: Duration,
    store_timeout: Duration,
    key_prefix: String,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.limit,
            window: Duration::from_secs(config.window_secs),
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            key_prefix: config.key_prefix.clone(),
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Counter key for an authenticated subject or a client address.
    pub fn key_for(&self, identity: Option<&Identity>, ip: &str) -> String {
        match identity {
            Some(Identity(subject)) => format!("{}user:{}", self.key_prefix, subject),
            None => format!("{}ip:{}", self.key_prefix, ip),
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.store_timeout)))
    }

    /// Charge one request against `key`.
    pub async fn check(&self, key: &str) -> Decision {
        if !self.enabled {
            return Decision::Bypassed;
        }

        let current = match self.bounded(self.store.current(key)).await {
            Ok(count) => count,
            Err(err) => return self.fail_open(key, &err),
        };
        if current >= self.limit {
            return Decision::Rejected { limit: self.limit };
        }

        let count = match self.bounded(self.store.increment(key, self.window)).await {
            Ok(count) => count,
            Err(err) => return self.fail_open(key, &err),
        };
        // Concurrent requests may have read the same count before incrementing.
        if count > self.limit {
            return Decision::Rejected { limit: self.limit };
        }

        Decision::Allowed {
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
        }
    }

    fn fail_open(&self, key: &str, err: &StoreError) -> Decision {
        // Fail open: the request proceeds unenforced.
        tracing::warn!(client_key = %key, error = %err, "Rate limit store failed, allowing request");
        metrics::record_rate_limit_bypass(err.reason());
        Decision::Bypassed
    }
}

fn set_limit_headers(headers: &mut HeaderMap, limit: u64, remaining: u64) {
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
}

/// Pipeline stage applying the limiter.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    async fn handle(&self, req: Request<Body>, next: Next<'_>) -> Response {
        if !self.limiter.is_enabled() {
            return next.run(req).await;
        }

        let key = self
            .limiter
            .key_for(req.extensions().get::<Identity>(), &client_ip(&req));

        match self.limiter.check(&key).await {
            Decision::Allowed { limit, remaining } => {
                let mut response = next.run(req).await;
                set_limit_headers(response.headers_mut(), limit, remaining);
                response
            }
            Decision::Rejected { limit } => {
                tracing::warn!(client_key = %key, limit, "Rate limit exceeded");
                metrics::record_rate_limited();
                let mut response = GatewayError::RateLimitExceeded { limit }.into_response();
                set_limit_headers(response.headers_mut(), limit, 0);
                response
            }
            Decision::Bypassed => next.run(req).await,
        }
    }
}
