//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dev_proxy_requests_started_total` (counter): forwarded requests by route, method
//! - `dev_proxy_upstream_errors_total` (counter): upstream failures by route
//!
//! # Design Decisions
//! - Counters are fed by a `DiagnosticsSink`, so the dispatcher never
//!   touches the recorder directly
//! - Without an installed recorder the macros are no-ops

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::observability::events::ProxyEvent;
use crate::observability::sink::DiagnosticsSink;

pub const REQUESTS_STARTED: &str = "dev_proxy_requests_started_total";
pub const UPSTREAM_ERRORS: &str = "dev_proxy_upstream_errors_total";

/// Install the Prometheus recorder and its scrape endpoint.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(REQUESTS_STARTED, "Requests forwarded to an upstream");
    metrics::describe_counter!(UPSTREAM_ERRORS, "Upstream failures surfaced to clients");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Counts proxy events.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSink;

impl DiagnosticsSink for MetricsSink {
    fn emit(&self, event: ProxyEvent) {
        match event {
            ProxyEvent::RequestStarted { route, method, .. } => {
                metrics::counter!(REQUESTS_STARTED, "route" => route, "method" => method).increment(1);
            }
            ProxyEvent::UpstreamError { route, .. } => {
                metrics::counter!(UPSTREAM_ERRORS, "route" => route).increment(1);
            }
        }
    }
}
