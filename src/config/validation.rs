//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route table integrity (prefix shape, duplicates, backend URLs)
//! - Validate value ranges (limits, windows, timeouts > 0)
//! - Reject signing algorithms that cannot be used with a shared secret
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::HeaderName;
use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route prefix {0:?} must start with '/'")]
    PrefixNotAbsolute(String),

    #[error("route prefix {0:?} is declared more than once")]
    DuplicatePrefix(String),

    #[error("backend {backend:?} for prefix {prefix:?} is not a valid http URL")]
    InvalidBackend { prefix: String, backend: String },

    #[error("unsupported signing algorithm {0:?} (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    #[error("auth.secret must be set when routes are configured")]
    MissingSecret,

    #[error("auth.identity_header {0:?} is not a valid header name")]
    InvalidIdentityHeader(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Parse a configured algorithm name into an HMAC [`Algorithm`].
pub fn parse_hmac_algorithm(name: &str) -> Option<Algorithm> {
    match name.parse::<Algorithm>() {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Some(alg),
        _ => None,
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::PrefixNotAbsolute(route.prefix.clone()));
        }
        if !seen.insert(route.prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(route.prefix.clone()));
        }
        let backend_ok = Url::parse(&route.backend)
            .map(|url| url.scheme() == "http" && url.host_str().is_some())
            .unwrap_or(false);
        if !backend_ok {
            errors.push(ValidationError::InvalidBackend {
                prefix: route.prefix.clone(),
                backend: route.backend.clone(),
            });
        }
    }

    if parse_hmac_algorithm(&config.auth.algorithm).is_none() {
        errors.push(ValidationError::UnsupportedAlgorithm(config.auth.algorithm.clone()));
    }
    if !config.routes.is_empty() && config.auth.secret.is_empty() {
        errors.push(ValidationError::MissingSecret);
    }
    if HeaderName::from_bytes(config.auth.identity_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidIdentityHeader(
            config.auth.identity_header.clone(),
        ));
    }

    let positives = [
        ("rate_limit.limit", config.rate_limit.limit),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.store_timeout_ms", config.rate_limit.store_timeout_ms),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ];
    for (field, value) in positives {
        if value == 0 {
            errors.push(ValidationError::NotPositive(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
