//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the longest matching prefix for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by prefix length at build time, so the first hit is the
//!   longest match
//! - O(n) prefix scan (acceptable for typical route counts)
//! - Explicit `None` rather than silent default

use crate::config::{AuthMode, RouteConfig};
use crate::routing::matcher::PathPrefixMatcher;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: PathPrefixMatcher,
    backend: String,
    auth: AuthMode,
}

impl Route {
    pub fn new(prefix: impl Into<String>, backend: impl Into<String>, auth: AuthMode) -> Self {
        let backend: String = backend.into();
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            backend: backend.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Backend base URL without a trailing slash.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn auth(&self) -> AuthMode {
        self.auth
    }
}

/// Static route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes; longer prefixes are checked first.
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));
        Self { routes }
    }

    pub fn from_config(configs: &[RouteConfig]) -> Self {
        Self::new(
            configs
                .iter()
                .map(|c| Route::new(c.prefix.clone(), c.backend.clone(), c.auth))
                .collect(),
        )
    }

    /// Find the route with the longest prefix matching `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
