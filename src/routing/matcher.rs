//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path against a declared prefix
//!
//! # Design Decisions
//! - Path matching is a plain, case-sensitive string prefix test:
//!   `/api` matches `/api`, `/api/users` and `/apiary`
//! - Query strings are not part of the matched path
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
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

    /// The prefix this matcher tests for.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` starts with the prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches("/api"));
        assert!(matcher.matches("/api/v1/users"));
        assert!(matcher.matches("/apiary"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
        assert!(!matcher.matches("/ap"));
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/some/client/asset.js"));
    }
}
