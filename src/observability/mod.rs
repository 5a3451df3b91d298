//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher exchanges produce:
//!     → events.rs (ProxyEvent values)
//!     → sink.rs (DiagnosticsSink: log line, channel, fan-out)
//!     → metrics.rs (counters, Prometheus scrape endpoint)
//!
//! Everything else logs through tracing:
//!     → logging.rs (subscriber setup, pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Events are fire-and-forget; sinks never block forwarding
//! - Request ID flows into every exchange log line
//! - Metrics are opt-in

pub mod events;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use events::ProxyEvent;
pub use metrics::MetricsSink;
pub use sink::{ChannelSink, DiagnosticsSink, FanoutSink, TracingSink};
