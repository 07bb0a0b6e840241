//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the shared clients (counter store, upstream pool) once
//! - Assemble the request pipeline in its fixed stage order
//! - Create the axum Router that hands every request to the pipeline
//! - Accept connections, serve HTTP/1.1 and HTTP/2, drain on shutdown
//!
//! # Design Decisions
//! - Connections are served by hyper-util's auto builder rather than
//!   `axum::serve` so HTTP/1.1 header-name casing is kept end to end
//! - The peer address is attached as `ConnectInfo<SocketAddr>` per request

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request},
    response::Response,
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, StoreBackend, ValidationError};
use crate::http::relay::Relay;
use crate::http::request::RequestIdStage;
use crate::lifecycle::Shutdown;
use crate::observability::AccessLogStage;
use crate::pipeline::{Chain, Dispatcher};
use crate::routing::RouteTable;
use crate::security::{AuthStage, RateLimitStage, RateLimiter, TokenValidator};
use crate::store::{CounterStore, MemoryCounterStore, RedisCounterStore, StoreError};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Failures while assembling the gateway.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("counter store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The API gateway HTTP server.
pub struct GatewayServer {
    router: Router,
    chain: Chain,
    memory_store: Option<Arc<MemoryCounterStore>>,
}

impl GatewayServer {
    /// Build the gateway, opening the configured counter store.
    pub fn new(config: &GatewayConfig) -> Result<Self, StartupError> {
        match config.rate_limit.backend {
            StoreBackend::Redis => {
                let store = Arc::new(RedisCounterStore::open(&config.redis.url)?);
                Self::with_store(config, store)
            }
            StoreBackend::Memory => {
                let store = Arc::new(MemoryCounterStore::new());
                let mut server = Self::with_store(config, store.clone())?;
                server.memory_store = Some(store);
                Ok(server)
            }
        }
    }

    /// Build the gateway on an explicit counter store.
    pub fn with_store(
        config: &GatewayConfig,
        store: Arc<dyn CounterStore>,
    ) -> Result<Self, StartupError> {
        let chain = build_chain(config, store)?;
        let router = build_router(chain.clone());
        tracing::info!(
            routes = config.routes.len(),
            stages = chain.len(),
            rate_limit_enabled = config.rate_limit.enabled,
            "Gateway pipeline assembled"
        );
        Ok(Self {
            router,
            chain,
            memory_store: None,
        })
    }

    /// The axum router, for in-process use (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        let sweeper = self
            .memory_store
            .map(|store| store.spawn_sweeper(SWEEP_INTERVAL));

        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder.http1().preserve_header_case(true);

        let stop = shutdown.notified();
        tokio::pin!(stop);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut stop => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((socket, remote)) => {
                        connections.spawn(serve_connection(
                            builder.clone(),
                            socket,
                            remote,
                            self.router.clone(),
                            shutdown.notified(),
                        ));
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        tracing::info!(connections = connections.len(), "Draining in-flight connections");
        while connections.join_next().await.is_some() {}

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Serve one connection until it closes or shutdown asks it to finish.
async fn serve_connection(
    builder: auto::Builder<TokioExecutor>,
    socket: TcpStream,
    remote: SocketAddr,
    router: Router,
    shutdown: impl Future<Output = ()>,
) {
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(remote));
        router.clone().oneshot(request)
    });

    let conn = builder.serve_connection(TokioIo::new(socket), service);
    tokio::pin!(conn);
    tokio::pin!(shutdown);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = &mut shutdown => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(err) = result {
        tracing::debug!(remote_addr = %remote, error = %err, "Connection ended with error");
    }
}

/// Stage order: request ID, access log, auth, rate limit, then dispatch.
fn build_chain(config: &GatewayConfig, store: Arc<dyn CounterStore>) -> Result<Chain, StartupError> {
    let routes = Arc::new(RouteTable::from_config(&config.routes));
    let validator = Arc::new(TokenValidator::new(&config.auth)?);
    let identity_header = HeaderName::from_bytes(config.auth.identity_header.as_bytes())
        .map_err(|_| ValidationError::InvalidIdentityHeader(config.auth.identity_header.clone()))?;
    let limiter = Arc::new(RateLimiter::new(store, &config.rate_limit));
    let dispatcher = Dispatcher::new(routes.clone(), Relay::new(&config.timeouts));

    Ok(Chain::builder(Arc::new(dispatcher))
        .stage(RequestIdStage)
        .stage(AccessLogStage::new(routes.clone()))
        .stage(AuthStage::new(validator, routes, identity_header))
        .stage(RateLimitStage::new(limiter))
        .build())
}

fn build_router(chain: Chain) -> Router {
    // Span only: the access log stage writes the per-request event.
    // `request_id` is recorded by `RequestIdStage` once the ID is settled.
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = tracing::field::Empty,
            )
        })
        .on_request(())
        .on_response(())
        .on_body_chunk(())
        .on_eos(())
        .on_failure(());

    Router::new()
        .route("/{*path}", any(gateway_handler))
        .route("/", any(gateway_handler))
        .with_state(chain)
        .layer(trace)
}

async fn gateway_handler(State(chain): State<Chain>, request: Request<Body>) -> Response {
    chain.handle(request).await
}
