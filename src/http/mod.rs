//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs  (axum setup, span per request, hands off to the chain)
//!     → request.rs (X-Request-ID assignment)
//!     → [auth, rate limit, route lookup]
//!     → relay.rs   (rewrite onto backend, stream response back)
//!     → Send to client
//! ```

pub mod relay;
pub mod request;
pub mod server;

pub use relay::Relay;
pub use request::{RequestId, RequestIdExt, RequestIdStage, X_REQUEST_ID};
pub use server::{GatewayServer, StartupError};
