//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route prefixes and upstream targets
//! - Validate listener and metrics addresses
//! - Detect shadowed routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - A route whose prefix starts with an earlier route's prefix can never
//!   match under first-match-wins, so it is rejected rather than ignored

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, RouteConfig};

/// Upstream schemes the proxy can forward to.
pub const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index} has an empty path_prefix")]
    EmptyPrefix { index: usize },

    #[error("path_prefix {prefix:?} must start with '/'")]
    MissingLeadingSlash { prefix: String },

    #[error("path_prefix {prefix:?} is declared more than once")]
    DuplicatePrefix { prefix: String },

    #[error("path_prefix {prefix:?} is unreachable: shadowed by earlier prefix {shadowed_by:?}")]
    ShadowedPrefix { prefix: String, shadowed_by: String },

    #[error("route {prefix:?} has invalid target {target:?}: {reason}")]
    InvalidTarget {
        prefix: String,
        target: String,
        reason: String,
    },

    #[error("route {prefix:?} uses unsupported scheme {scheme:?}")]
    UnsupportedScheme { prefix: String, scheme: String },

    #[error("invalid {field} {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("fallback.index_file requires fallback.static_dir")]
    IndexWithoutStaticDir,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.fallback.index_file.is_some() && config.fallback.static_dir.is_none() {
        errors.push(ValidationError::IndexWithoutStaticDir);
    }

    collect_route_errors(&config.routes, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a route table on its own.
pub fn validate_routes(routes: &[RouteConfig]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    collect_route_errors(routes, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_route_errors(routes: &[RouteConfig], errors: &mut Vec<ValidationError>) {
    for (index, route) in routes.iter().enumerate() {
        let prefix = &route.path_prefix;

        if prefix.is_empty() {
            errors.push(ValidationError::EmptyPrefix { index });
        } else if !prefix.starts_with('/') {
            errors.push(ValidationError::MissingLeadingSlash {
                prefix: prefix.clone(),
            });
        }

        if let Err(e) = validate_target(route) {
            errors.push(e);
        }

        if prefix.is_empty() {
            continue;
        }

        // Only report the first earlier route that hides this one.
        let earlier = routes[..index]
            .iter()
            .map(|r| &r.path_prefix)
            .find(|p| !p.is_empty() && prefix.starts_with(p.as_str()));

        match earlier {
            Some(p) if p == prefix => errors.push(ValidationError::DuplicatePrefix {
                prefix: prefix.clone(),
            }),
            Some(p) => errors.push(ValidationError::ShadowedPrefix {
                prefix: prefix.clone(),
                shadowed_by: p.clone(),
            }),
            None => {}
        }
    }
}

fn validate_target(route: &RouteConfig) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidTarget {
        prefix: route.path_prefix.clone(),
        target: route.target.clone(),
        reason,
    };

    let url = Url::parse(&route.target).map_err(|e| invalid(e.to_string()))?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::UnsupportedScheme {
            prefix: route.path_prefix.clone(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed".to_string()));
    }

    Ok(())
}
