//! Request pipeline composition.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RequestIdStage      (assign / propagate X-Request-ID)
//!     → AccessLogStage      (one log line once the chain unwinds)
//!     → AuthStage           (per-route required / optional)
//!     → RateLimitStage      (fixed window, fail-open)
//!     → Dispatcher          (longest-prefix route → relay)
//! Response flows back through the same stages in reverse.
//! ```
//!
//! # Design Decisions
//! - Each stage is a trait object with a single `handle(request, next)`
//! - Stages either call `next.run(request)` or return a terminal response
//! - The chain is built once at startup and shared by every request task

pub mod dispatch;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

pub use dispatch::Dispatcher;

/// A single middleware step.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Process the request, delegating to `next` or short-circuiting.
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response;
}

/// The terminal handler at the end of the chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: Request<Body>) -> Response;
}

/// The remainder of the chain after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Run the remaining stages and the endpoint.
    pub async fn run(self, request: Request<Body>) -> Response {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    endpoint: self.endpoint,
                };
                stage.handle(request, next).await
            }
            None => self.endpoint.call(request).await,
        }
    }
}

/// An ordered, immutable list of stages in front of an endpoint.
#[derive(Clone)]
pub struct Chain {
    stages: Arc<[Arc<dyn Stage>]>,
    endpoint: Arc<dyn Endpoint>,
}

impl Chain {
    /// Start building a chain that terminates in `endpoint`.
    pub fn builder(endpoint: Arc<dyn Endpoint>) -> ChainBuilder {
        ChainBuilder {
            stages: Vec::new(),
            endpoint,
        }
    }

    /// Push a request through every stage.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        Next {
            stages: &self.stages,
            endpoint: self.endpoint.as_ref(),
        }
        .run(request)
        .await
    }

    /// Number of stages in front of the endpoint.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder that appends stages in execution order.
pub struct ChainBuilder {
    stages: Vec<Arc<dyn Stage>>,
    endpoint: Arc<dyn Endpoint>,
}

impl ChainBuilder {
    /// Append a stage; stages run in the order they are added.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn build(self) -> Chain {
        Chain {
            stages: self.stages.into(),
            endpoint: self.endpoint,
        }
    }
}
