//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate prefix)
//!     → Return: matched Route or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by prefix length (longest first)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins

pub mod matcher;
pub mod router;

pub use router::{Route, RouteTable};
