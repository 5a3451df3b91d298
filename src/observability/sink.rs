//! Diagnostics sinks.
//!
//! # Responsibilities
//! - Accept `ProxyEvent`s from any number of concurrent exchanges
//! - Hand them to a log stream, a channel, or metrics
//!
//! # Design Decisions
//! - `emit` is synchronous and must not block or fail
//! - The dispatcher only knows the trait; the binary picks the sinks

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::observability::events::ProxyEvent;

/// Consumer of proxy lifecycle events.
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, event: ProxyEvent);
}

/// Writes each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, event: ProxyEvent) {
        match event {
            ProxyEvent::RequestStarted { route, method, path } => {
                tracing::info!(route = %route, method = %method, path = %path, "Proxy request");
            }
            ProxyEvent::UpstreamError { route, path, message } => {
                tracing::error!(route = %route, path = %path, error = %message, "Proxy error");
            }
        }
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProxyEvent>,
}

impl ChannelSink {
    /// Create the sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProxyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DiagnosticsSink for ChannelSink {
    fn emit(&self, event: ProxyEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

/// Delivers every event to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticsSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticsSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn DiagnosticsSink>) {
        self.sinks.push(sink);
    }
}

impl DiagnosticsSink for FanoutSink {
    fn emit(&self, event: ProxyEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
