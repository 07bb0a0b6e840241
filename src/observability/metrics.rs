//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_auth_failures_total` (counter): rejected tokens by reason
//! - `gateway_rate_limited_total` (counter): 429 responses
//! - `gateway_rate_limit_bypass_total` (counter): fail-open decisions by reason
//! - `gateway_upstream_errors_total` (counter): relay failures by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub mod names {
    pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";
    pub const AUTH_FAILURES_TOTAL: &str = "gateway_auth_failures_total";
    pub const RATE_LIMITED_TOTAL: &str = "gateway_rate_limited_total";
    pub const RATE_LIMIT_BYPASS_TOTAL: &str = "gateway_rate_limit_bypass_total";
    pub const UPSTREAM_ERRORS_TOTAL: &str = "gateway_upstream_errors_total";
}

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(names::REQUESTS_TOTAL, "Total requests handled by the gateway");
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Request duration in seconds, including the upstream call"
    );
    describe_counter!(names::AUTH_FAILURES_TOTAL, "Requests rejected by bearer token validation");
    describe_counter!(names::RATE_LIMITED_TOTAL, "Requests rejected by the rate limiter");
    describe_counter!(
        names::RATE_LIMIT_BYPASS_TOTAL,
        "Requests allowed because the counter store failed"
    );
    describe_counter!(names::UPSTREAM_ERRORS_TOTAL, "Failed upstream calls");

    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        names::REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status,
        "route" => route.to_string()
    )
    .increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure(reason: &'static str) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!(names::RATE_LIMITED_TOTAL).increment(1);
}

pub fn record_rate_limit_bypass(reason: &'static str) {
    counter!(names::RATE_LIMIT_BYPASS_TOTAL, "reason" => reason).increment(1);
}

/// `kind` is `unavailable`, `timeout` or `body`.
pub fn record_upstream_error(kind: &'static str) {
    counter!(names::UPSTREAM_ERRORS_TOTAL, "kind" => kind).increment(1);
}
