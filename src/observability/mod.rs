//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → logging.rs (one access log line per request, JSON or pretty)
//!     → metrics.rs (request counters, latency histogram)
//!
//! Pipeline stages:
//!     → metrics.rs (auth failures, 429s, fail-open bypasses, upstream errors)
//! ```
//!
//! # Design Decisions
//! - Structured fields only; no interpolated log messages
//! - Request ID appears on every access log line
//! - Metrics are recorded unconditionally; without an installed exporter
//!   the `metrics` facade discards them

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, AccessLogStage};
