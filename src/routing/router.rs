//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Look up the matching route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (route tables are a handful of entries)
//! - `None` means "not ours": the caller serves the path locally

use std::sync::Arc;

use crate::config::{validate_routes, RouteConfig, ValidationError};
use crate::routing::binding::RouteBinding;

/// Ordered, immutable table of route bindings.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteBinding>>,
}

impl RouteTable {
    /// Validate and compile a route table from configuration.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, Vec<ValidationError>> {
        validate_routes(routes)?;

        let routes = routes
            .iter()
            .map(|cfg| RouteBinding::from_config(cfg).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| vec![e])?;

        for route in &routes {
            tracing::debug!(
                route = %route.name(),
                prefix = %route.path_prefix(),
                target = %route.target(),
                rewrite_origin = route.rewrites_origin(),
                timeout_ms = route.timeout().map(|t| t.as_millis() as u64).unwrap_or(0),
                upgrade = route.supports_upgrade(),
                "Route compiled"
            );
            if route.skips_tls_verification() {
                tracing::warn!(
                    route = %route.name(),
                    target = %route.target(),
                    "Upstream certificate verification disabled"
                );
            }
        }

        Ok(Self { routes })
    }

    /// First binding, in declaration order, whose prefix starts `path`.
    pub fn match_path(&self, path: &str) -> Option<&Arc<RouteBinding>> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Arc<RouteBinding>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// True if any binding needs a client that skips certificate checks.
    pub fn needs_insecure_client(&self) -> bool {
        self.routes.iter().any(|r| r.skips_tls_verification())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    fn route(prefix: &str, port: u16) -> RouteConfig {
        RouteConfig {
            name: None,
            path_prefix: prefix.to_string(),
            target: format!("http://127.0.0.1:{port}"),
            rewrite_origin: false,
            allow_insecure_tls: false,
            timeout_ms: 0,
            supports_upgrade: false,
        }
    }

    #[test]
    fn first_match_in_declaration_order() {
        let table = RouteTable::from_config(&[
            route("/api/v2", 9002),
            route("/api", 9001),
            route("/ws", 9003),
        ])
        .unwrap();

        assert_eq!(table.match_path("/api/v2/models").unwrap().target().port(), Some(9002));
        assert_eq!(table.match_path("/api/v1/models").unwrap().target().port(), Some(9001));
        assert_eq!(table.match_path("/api").unwrap().target().port(), Some(9001));
        assert_eq!(table.match_path("/ws").unwrap().target().port(), Some(9003));
    }

    #[test]
    fn unmatched_path_returns_none() {
        let table = RouteTable::from_config(&ProxyConfig::default().routes).unwrap();
        assert!(table.match_path("/some/client/asset.js").is_none());
        assert!(table.match_path("/").is_none());
        assert!(table.match_path("/API").is_none());
    }

    #[test]
    fn matching_is_deterministic() {
        let table = RouteTable::from_config(&ProxyConfig::default().routes).unwrap();
        let paths = ["/api/chats", "/health", "/ollama/api/tags", "/ws/socket.io", "/favicon.png"];

        for path in paths {
            let first = table.match_path(path).map(|r| r.name().to_string());
            for _ in 0..10 {
                assert_eq!(table.match_path(path).map(|r| r.name().to_string()), first);
            }
        }
    }

    #[test]
    fn default_table_routes() {
        let table = RouteTable::from_config(&ProxyConfig::default().routes).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.match_path("/ollama/api/generate").unwrap().name(), "ollama");
        assert!(table.match_path("/ws/socket.io/").unwrap().supports_upgrade());
        assert!(!table.needs_insecure_client());
    }

    #[test]
    fn shadowed_routes_are_rejected() {
        let err = RouteTable::from_config(&[route("/api", 9001), route("/api/v2", 9002)]).unwrap_err();
        assert!(matches!(err[0], ValidationError::ShadowedPrefix { .. }));
    }

    #[test]
    fn insecure_https_route_needs_insecure_client() {
        let mut cfg = route("/secure", 9443);
        cfg.target = "https://127.0.0.1:9443".into();
        cfg.allow_insecure_tls = true;
        let table = RouteTable::from_config(&[cfg]).unwrap();
        assert!(table.needs_insecure_client());
    }
}
