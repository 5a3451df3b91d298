//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default upstream of the built-in route table.
pub const DEFAULT_BACKEND: &str = "http://localhost:8080";

/// Root configuration for the development proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered route table. First match wins.
    pub routes: Vec<RouteConfig>,

    /// Handling of paths no route matches.
    pub fallback: FallbackConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: default_routes(),
            fallback: FallbackConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// The development route set the proxy ships with: every backend-owned
/// prefix goes to the local API server.
fn default_routes() -> Vec<RouteConfig> {
    let route = |name: &str, prefix: &str, timeout_ms: u64| RouteConfig {
        name: Some(name.to_string()),
        path_prefix: prefix.to_string(),
        target: DEFAULT_BACKEND.to_string(),
        rewrite_origin: true,
        allow_insecure_tls: true,
        timeout_ms,
        supports_upgrade: false,
    };

    vec![
        route("api", "/api", 10_000),
        route("health", "/health", 0),
        route("ollama", "/ollama", 30_000),
        RouteConfig {
            name: Some("websocket".to_string()),
            path_prefix: "/ws".to_string(),
            target: "ws://localhost:8080".to_string(),
            rewrite_origin: true,
            allow_insecure_tls: false,
            timeout_ms: 0,
            supports_upgrade: true,
        },
        route("oauth", "/oauth", 0),
        route("static", "/static", 0),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5173").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5173".to_string(),
        }
    }
}

/// A single path-prefix → upstream binding as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Route label for logs and events. Defaults to the prefix.
    #[serde(default)]
    pub name: Option<String>,

    /// Path prefix to match (plain string prefix, case-sensitive).
    pub path_prefix: String,

    /// Upstream URL: `http`, `https`, `ws` or `wss`.
    pub target: String,

    /// Rewrite the `Host` header to the upstream's authority.
    #[serde(default)]
    pub rewrite_origin: bool,

    /// Skip upstream certificate verification (TLS targets only).
    #[serde(default)]
    pub allow_insecure_tls: bool,

    /// Time to wait for the upstream response head. 0 disables the timeout.
    #[serde(default)]
    pub timeout_ms: u64,

    /// Relay protocol-upgrade handshakes (WebSocket) on this route.
    #[serde(default)]
    pub supports_upgrade: bool,
}

/// Serving of paths that no route claims.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Directory of built client assets. `None` answers 404.
    pub static_dir: Option<PathBuf>,

    /// File inside `static_dir` served for unknown paths (SPA entry point).
    pub index_file: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
