//! Development reverse proxy library.
//!
//! Forwards requests whose path starts with a configured prefix to a
//! backend, relays protocol upgrades, and serves everything else locally.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::{Error, ProxyError, Result};
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use observability::{DiagnosticsSink, ProxyEvent};
pub use routing::RouteTable;
