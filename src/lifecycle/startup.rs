//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize the diagnostics sinks (log lines, optional metrics)
//! - Build the server from a validated configuration
//! - Bind the listener and run until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: a bad route table or an unbindable address is fatal
//! - A metrics endpoint that cannot start is logged, not fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics::init_metrics;
use crate::observability::{DiagnosticsSink, FanoutSink, MetricsSink, TracingSink};

/// Pick the diagnostics sink for `config`, starting the metrics endpoint if enabled.
pub fn build_sink(config: &ProxyConfig) -> Arc<dyn DiagnosticsSink> {
    let observability = &config.observability;
    if !observability.metrics_enabled {
        return Arc::new(TracingSink);
    }

    let started = observability
        .metrics_address
        .parse::<SocketAddr>()
        .map_err(|e| e.to_string())
        .and_then(|addr| init_metrics(addr).map_err(|e| e.to_string()));

    match started {
        Ok(()) => Arc::new(FanoutSink::new(vec![
            Arc::new(TracingSink),
            Arc::new(MetricsSink),
        ])),
        Err(e) => {
            tracing::error!(
                metrics_address = %observability.metrics_address,
                error = %e,
                "Failed to start metrics endpoint"
            );
            Arc::new(TracingSink)
        }
    }
}

/// Run the proxy until SIGINT or SIGTERM.
pub async fn run(config: ProxyConfig) -> crate::Result<()> {
    let sink = build_sink(&config);
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?.with_sink(sink);

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_task = signals::spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;
    signal_task.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
