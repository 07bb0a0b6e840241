//! Terminal endpoint: route lookup and relay.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::http::relay::Relay;
use crate::pipeline::Endpoint;
use crate::routing::RouteTable;

pub struct Dispatcher {
    routes: Arc<RouteTable>,
    relay: Relay,
}

impl Dispatcher {
    pub fn new(routes: Arc<RouteTable>, relay: Relay) -> Self {
        Self { routes, relay }
    }
}

#[async_trait]
impl Endpoint for Dispatcher {
    async fn call(&self, request: Request<Body>) -> Response {
        let path = request.uri().path().to_string();
        let Some(route) = self.routes.resolve(&path) else {
            tracing::debug!(path = %path, "No route matched");
            return GatewayError::RouteNotFound { path }.into_response();
        };

        match self.relay.forward(request, route.backend()).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(route = %route.prefix(), error = %err, "Upstream request failed");
                err.into_response()
            }
        }
    }
}
