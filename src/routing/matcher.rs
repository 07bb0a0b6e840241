//! Path prefix matching.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Plain string prefix: "/users" matches "/users", "/users/me" and "/users2"
//! - No regex to guarantee O(n) matching

/// Matches the request path against a configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Prefix length, used to rank overlapping matches.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
