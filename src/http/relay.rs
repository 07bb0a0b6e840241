//! Upstream relay.
//!
//! # Responsibilities
//! - Rewrite the inbound request onto a backend base URL
//! - Strip hop-by-hop headers on the way out and on the way back
//! - Stream bodies in both directions without buffering
//! - Map connect failures and timeouts to gateway errors
//!
//! # Design Decisions
//! - One pooled client for the process, shared by every request task
//! - `Host` is not forwarded; hyper derives it from the backend URI
//! - Header-name casing survives on HTTP/1.1: the inbound request's
//!   extensions (hyper's case map) ride along to the client, and the
//!   backend's casing comes back the same way
//! - The timeout covers connect and response head; body streaming is not
//!   bounded

use std::time::Duration;

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{Request, Uri};
use axum::response::Response;
use futures_util::TryStreamExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::security::headers::{forwardable_headers, strip_hop_by_hop};

/// Build the outbound URI: backend base + original path + query.
pub fn upstream_uri(backend: &str, original: &Uri) -> Result<Uri, GatewayError> {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", backend.trim_end_matches('/'), path_and_query);
    target
        .parse::<Uri>()
        .map_err(|err| GatewayError::InternalConstruction(format!("{target}: {err}")))
}

/// Forwards requests to backends over a shared connection pool.
#[derive(Clone)]
pub struct Relay {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

impl Relay {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .http1_preserve_header_case(true)
            .pool_idle_timeout(Duration::from_secs(timeouts.pool_idle_secs))
            .build(connector);

        Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Relay `req` to `backend` and stream the answer back.
    pub async fn forward(&self, req: Request<Body>, backend: &str) -> Result<Response, GatewayError> {
        let uri = upstream_uri(backend, req.uri())?;
        let (parts, body) = req.into_parts();

        let mut headers = forwardable_headers(&parts.headers);
        headers.remove(HOST);

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)
            .map_err(|err| GatewayError::InternalConstruction(err.to_string()))?;
        *outbound.headers_mut() = headers;
        *outbound.extensions_mut() = parts.extensions;

        tracing::debug!(backend = %backend, uri = %outbound.uri(), "Forwarding request");

        let response =
            match tokio::time::timeout(self.upstream_timeout, self.client.request(outbound)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    metrics::record_upstream_error("unavailable");
                    return Err(GatewayError::BackendUnavailable {
                        backend: backend.to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(_) => {
                    metrics::record_upstream_error("timeout");
                    return Err(GatewayError::BackendTimeout {
                        backend: backend.to_string(),
                        timeout: self.upstream_timeout,
                    });
                }
            };

        let (mut parts, incoming) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);

        let backend_name = backend.to_string();
        let stream = Body::new(incoming).into_data_stream().inspect_err(move |err| {
            // Status and headers are already on the wire; all we can do is log.
            metrics::record_upstream_error("body");
            tracing::warn!(backend = %backend_name, error = %err, "Upstream body failed mid-stream");
        });

        Ok(Response::from_parts(parts, Body::from_stream(stream)))
    }
}
