//! Authentication stage.
//! Enforces the per-route bearer token policy.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::{IntoResponse, Response};

use crate::config::AuthMode;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::pipeline::{Next, Stage};
use crate::routing::RouteTable;
use crate::security::token::{AuthError, TokenValidator};

/// Identity attached to authenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity(pub String);

pub struct AuthStage {
    validator: Arc<TokenValidator>,
    routes: Arc<RouteTable>,
    identity_header: HeaderName,
}

impl AuthStage {
    pub fn new(
        validator: Arc<TokenValidator>,
        routes: Arc<RouteTable>,
        identity_header: HeaderName,
    ) -> Self {
        Self {
            validator,
            routes,
            identity_header,
        }
    }
}

#[async_trait]
impl Stage for AuthStage {
    async fn handle(&self, mut req: Request<Body>, next: Next<'_>) -> Response {
        // Backends trust this header, so a caller-supplied value never survives.
        req.headers_mut().remove(&self.identity_header);

        // Unrouted paths carry no policy; dispatch answers 404.
        let mode = match self.routes.resolve(req.uri().path()) {
            Some(route) => route.auth(),
            None => return next.run(req).await,
        };

        let verified = self
            .validator
            .validate_header(req.headers().get(AUTHORIZATION))
            .and_then(|claims| {
                HeaderValue::from_str(&claims.subject)
                    .map(|value| (claims.subject, value))
                    .map_err(|_| AuthError::InvalidToken)
            });

        match (verified, mode) {
            (Ok((subject, value)), _) => {
                req.headers_mut().insert(self.identity_header.clone(), value);
                req.extensions_mut().insert(Identity(subject));
                next.run(req).await
            }
            (Err(err), AuthMode::Optional) => {
                if err != AuthError::MissingToken {
                    tracing::debug!(reason = err.reason(), "Ignoring bad token on optional route");
                }
                next.run(req).await
            }
            (Err(err), AuthMode::Required) => {
                tracing::debug!(reason = err.reason(), path = %req.uri().path(), "Authentication failed");
                metrics::record_auth_failure(err.reason());
                GatewayError::from(err).into_response()
            }
        }
    }
}
