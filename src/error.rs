//! Error types.
//!
//! `ProxyError` covers a single exchange and never escapes it: the
//! dispatcher turns it into a gateway status and one diagnostic event.
//! `Error` covers startup, where failing fast is the right answer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// Failure of one forwarded exchange.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream {target} unreachable: {message}")]
    UpstreamUnreachable { target: String, message: String },

    #[error("upstream {target} did not respond within {timeout_ms}ms")]
    UpstreamTimeout { target: String, timeout_ms: u64 },

    #[error("protocol upgrade with {target} failed: {message}")]
    UpgradeFailed { target: String, message: String },

    #[error("relay interrupted: {0}")]
    RelayInterrupted(#[source] std::io::Error),
}

impl ProxyError {
    /// Gateway status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamUnreachable { .. }
            | ProxyError::UpgradeFailed { .. }
            | ProxyError::RelayInterrupted(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether this failure is reported as an `UpstreamError` event.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ProxyError::RelayInterrupted(_))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        // Detail goes to diagnostics only.
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Bad Gateway");
        (status, reason).into_response()
    }
}

/// Render an error and its source chain on one line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Startup failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
