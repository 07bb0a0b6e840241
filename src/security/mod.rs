//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs       (bearer token per route policy, identity injection)
//!         → token.rs  (signature, algorithm pin, expiry, subject)
//!     → rate_limit.rs (fixed window per identity or client IP)
//!         → client_ip.rs (X-Forwarded-For → X-Real-IP → socket)
//!     → headers.rs    (hop-by-hop removal, used by the relay)
//! ```
//!
//! # Design Decisions
//! - Authentication fails closed on required routes
//! - Rate limiting fails open when the counter store is unhealthy
//! - No trust in client-supplied identity headers

pub mod auth;
pub mod client_ip;
pub mod headers;
pub mod rate_limit;
pub mod token;

pub use auth::{AuthStage, Identity};
pub use rate_limit::{Decision, RateLimitStage, RateLimiter};
pub use token::{AuthError, TokenClaims, TokenValidator};
