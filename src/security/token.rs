//! Bearer token validation.
//!
//! Verifies an HMAC-signed JWT against the configured secret and algorithm
//! and extracts the `sub` claim as the caller identity. Holds only immutable
//! key material, so a single validator is shared by every request task.

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::validation::{parse_hmac_algorithm, ValidationError};
use crate::config::AuthConfig;

/// Token validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token")]
    InvalidToken,
    #[error("bearer token has expired")]
    ExpiredToken,
}

impl AuthError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing",
            AuthError::InvalidToken => "invalid",
            AuthError::ExpiredToken => "expired",
        }
    }
}

/// Claims of a verified token. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Authoritative user identifier.
    pub subject: String,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Algorithm the token was signed with.
    pub algorithm: Algorithm,
    pub issuer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<Value>,
    exp: Option<Value>,
    iss: Option<String>,
}

/// Stateless bearer token validator.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// Build a validator from configuration.
    pub fn new(config: &AuthConfig) -> Result<Self, ValidationError> {
        let algorithm = parse_hmac_algorithm(&config.algorithm)
            .ok_or_else(|| ValidationError::UnsupportedAlgorithm(config.algorithm.clone()))?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = config.leeway_secs;
        validation.validate_aud = false;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            validation,
        })
    }

    /// Validate the raw `Authorization` header value.
    pub fn validate_header(&self, header: Option<&HeaderValue>) -> Result<TokenClaims, AuthError> {
        let value = header.ok_or(AuthError::MissingToken)?;
        let value = value.to_str().map_err(|_| AuthError::InvalidToken)?.trim();
        if value.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidToken)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::InvalidToken);
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        self.validate(token)
    }

    /// Validate a bare token string.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        // Pin the algorithm before touching the signature.
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        if header.alg != self.algorithm {
            tracing::debug!(
                expected = ?self.algorithm,
                presented = ?header.alg,
                "Token algorithm mismatch"
            );
            return Err(AuthError::InvalidToken);
        }

        let data = decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            }
        })?;
        let claims = data.claims;

        let subject = match claims.sub {
            Some(Value::String(sub)) if !sub.is_empty() => sub,
            _ => return Err(AuthError::InvalidToken),
        };
        let expires_at = claims
            .exp
            .as_ref()
            .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64)))
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or(AuthError::InvalidToken)?;

        Ok(TokenClaims {
            subject,
            expires_at,
            algorithm: header.alg,
            issuer: claims.iss,
        })
    }
}
