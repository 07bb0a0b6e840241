//! Gateway error taxonomy and its JSON rendering.
//!
//! Every failure the pipeline surfaces to a caller is a [`GatewayError`].
//! Counter store failures never appear here: the rate limiter recovers from
//! them locally (fail-open).

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::security::token::AuthError;

/// Errors that terminate a request with a gateway-generated response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("rate limit of {limit} requests exceeded")]
    RateLimitExceeded { limit: u64 },

    #[error("no route matches {path}")]
    RouteNotFound { path: String },

    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("backend {backend} did not respond within {timeout:?}")]
    BackendTimeout { backend: String, timeout: Duration },

    #[error("failed to build upstream request: {0}")]
    InternalConstruction(String),
}

/// Error response body: `{"error": "<short code>", "message": "<human text>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::BackendUnavailable { .. } | GatewayError::BackendTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::InternalConstruction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::RateLimitExceeded { .. } => "rate limit exceeded",
            GatewayError::RouteNotFound { .. } => "not found",
            GatewayError::BackendUnavailable { .. } | GatewayError::BackendTimeout { .. } => {
                "service unavailable"
            }
            GatewayError::InternalConstruction(_) => "internal error",
        }
    }

    /// Caller-facing message. Backend addresses and internal causes stay in
    /// the logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::Unauthorized(err) => err.to_string(),
            GatewayError::RateLimitExceeded { .. } => {
                "too many requests, retry after the current window".to_string()
            }
            GatewayError::RouteNotFound { path } => format!("no route matches {path}"),
            GatewayError::BackendUnavailable { .. } => {
                "the upstream service is unavailable".to_string()
            }
            GatewayError::BackendTimeout { .. } => {
                "the upstream service did not respond in time".to_string()
            }
            GatewayError::InternalConstruction(_) => {
                "the gateway could not forward the request".to_string()
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
