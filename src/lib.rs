//! API gateway request pipeline.
//!
//! Authenticates bearer tokens, rate limits per client on a shared counter
//! store, and relays requests to backends chosen by longest path prefix.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod security;
pub mod store;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
