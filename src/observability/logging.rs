//! Structured logging.
//!
//! # Responsibilities
//! - Install the global tracing subscriber (pretty or JSON)
//! - Emit exactly one access log line per request
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level so operators can raise
//!   verbosity without editing config
//! - The access line is written after the response is produced, so it
//!   carries the final status including gateway-generated errors

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::pipeline::{Next, Stage};
use crate::routing::RouteTable;
use crate::security::client_ip::remote_addr;

/// Build the filter: `RUST_LOG` if set and valid, else the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(config));
    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
}

/// Access log and request metrics.
pub struct AccessLogStage {
    routes: Arc<RouteTable>,
}

impl AccessLogStage {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl Stage for AccessLogStage {
    async fn handle(&self, req: Request<Body>, next: Next<'_>) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = req
            .request_id()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();
        let remote = remote_addr(&req)
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        let route = self
            .routes
            .resolve(&path)
            .map(|route| route.prefix().to_string())
            .unwrap_or_else(|| "none".to_string());

        let response = next.run(req).await;

        let status = response.status().as_u16();
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            route = %route,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            remote_addr = %remote,
            "request completed"
        );
        metrics::record_request(method.as_str(), status, &route, start);

        response
    }
}
