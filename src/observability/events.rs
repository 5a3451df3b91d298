//! Diagnostic events emitted by the dispatcher.

use std::fmt;

/// A fire-and-forget proxy lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    /// Forwarding of a matched, non-upgrade request began.
    RequestStarted {
        route: String,
        method: String,
        path: String,
    },
    /// The upstream could not be reached, timed out, or dropped the exchange.
    UpstreamError {
        route: String,
        path: String,
        message: String,
    },
}

impl ProxyEvent {
    pub fn route(&self) -> &str {
        match self {
            ProxyEvent::RequestStarted { route, .. } | ProxyEvent::UpstreamError { route, .. } => route,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ProxyEvent::RequestStarted { path, .. } | ProxyEvent::UpstreamError { path, .. } => path,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProxyEvent::UpstreamError { .. })
    }
}

impl fmt::Display for ProxyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyEvent::RequestStarted { route, method, path } => {
                write!(f, "[{route}] {method} {path}")
            }
            ProxyEvent::UpstreamError { route, path, message } => {
                write!(f, "[{route}] proxy error on {path}: {message}")
            }
        }
    }
}
