//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → dispatcher.rs (route lookup)
//!         ├─ no match   → fallback.rs (local assets / 404)
//!         ├─ upgrade    → upgrade.rs (handshake, duplex byte relay)
//!         └─ plain      → forward.rs (request relay, deadline)
//!     → request.rs / response.rs (header rewriting, streaming)
//!     → upstream.rs (reqwest clients per TLS policy)
//!
//! Every matched request is tracked as an exchange (exchange.rs).
//! ```

pub mod dispatcher;
pub mod exchange;
pub mod fallback;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod upgrade;
pub mod upstream;

pub use dispatcher::Dispatcher;
pub use exchange::{ExchangeId, ExchangeState, ExchangeTracker, ForwardedExchange};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
