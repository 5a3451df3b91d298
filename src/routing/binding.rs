//! Compiled route bindings.

use std::time::Duration;

use url::Url;

use crate::config::{RouteConfig, ValidationError};
use crate::routing::matcher::PathPrefixMatcher;

/// One path-prefix → upstream binding, ready for dispatch.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    name: String,
    matcher: PathPrefixMatcher,
    /// Target as configured (may be `ws`/`wss`).
    target: Url,
    /// Target with the scheme mapped onto HTTP.
    base: Url,
    rewrite_origin: bool,
    allow_insecure_tls: bool,
    timeout: Option<Duration>,
    supports_upgrade: bool,
}

impl RouteBinding {
    /// Compile a route from its configuration entry.
    pub fn from_config(config: &RouteConfig) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidTarget {
            prefix: config.path_prefix.clone(),
            target: config.target.clone(),
            reason: reason.to_string(),
        };

        let target = Url::parse(&config.target).map_err(|e| invalid(&e.to_string()))?;
        let mut base = target.clone();
        let http_scheme = match target.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => {
                return Err(ValidationError::UnsupportedScheme {
                    prefix: config.path_prefix.clone(),
                    scheme: other.to_string(),
                })
            }
        };
        base.set_scheme(http_scheme)
            .map_err(|()| invalid("cannot map scheme onto HTTP"))?;

        Ok(Self {
            name: config
                .name
                .clone()
                .unwrap_or_else(|| config.path_prefix.clone()),
            matcher: PathPrefixMatcher::new(config.path_prefix.clone()),
            target,
            base,
            rewrite_origin: config.rewrite_origin,
            allow_insecure_tls: config.allow_insecure_tls,
            timeout: (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms)),
            supports_upgrade: config.supports_upgrade,
        })
    }

    /// Route label used in logs and diagnostic events.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path_prefix(&self) -> &str {
        self.matcher.prefix()
    }

    /// Upstream as configured.
    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn rewrites_origin(&self) -> bool {
        self.rewrite_origin
    }

    /// Whether certificate checks are skipped for this upstream.
    /// Only ever true for TLS targets.
    pub fn skips_tls_verification(&self) -> bool {
        self.allow_insecure_tls && self.base.scheme() == "https"
    }

    /// Deadline for the upstream response head, `None` if unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn supports_upgrade(&self) -> bool {
        self.supports_upgrade
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// Build the upstream URL for a client request path and query.
    /// A base path on the target is prepended to the request path.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        let base_path = self.base.path().trim_end_matches('/');
        if !base_path.is_empty() {
            url.set_path(&format!("{base_path}{path}"));
        } else {
            url.set_path(path);
        }
        url.set_query(query);
        url
    }
}
