//! Exchange state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track each proxied exchange through its states
//! - Generate unique exchange IDs for tracing
//! - Count in-flight exchanges for shutdown reporting
//!
//! # States
//! ```text
//! Received → Matched → Forwarding → Completed
//!                │          ├─────→ TimedOut
//!                └──────────┴─────→ Errored
//! ```
//! Unmatched requests never become an exchange. Terminal states are
//! mutually exclusive; an exchange dropped before reaching one was
//! cancelled by its client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::Method;
use url::Url;

use crate::routing::RouteBinding;

/// Global atomic counter for exchange IDs.
static EXCHANGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId(u64);

impl ExchangeId {
    /// Generate a new unique exchange ID.
    pub fn new() -> Self {
        Self(EXCHANGE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ex-{}", self.0)
    }
}

/// Lifecycle state of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Received,
    Matched,
    Forwarding,
    Completed,
    TimedOut,
    Errored,
}

impl ExchangeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExchangeState::Completed | ExchangeState::TimedOut | ExchangeState::Errored
        )
    }

    /// Legal edges of the state machine.
    pub fn can_transition_to(self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        matches!(
            (self, next),
            (Received, Matched)
                | (Matched, Forwarding)
                | (Matched, Errored)
                | (Forwarding, Completed)
                | (Forwarding, TimedOut)
                | (Forwarding, Errored)
        )
    }
}

/// Counts in-flight exchanges.
#[derive(Debug, Clone, Default)]
pub struct ExchangeTracker {
    active_count: Arc<AtomicU64>,
}

impl ExchangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new exchange. Returns a guard that decrements on drop.
    pub fn track(&self) -> ExchangeGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ExchangeGuard {
            active_count: Arc::clone(&self.active_count),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Keeps an exchange counted while alive.
#[derive(Debug)]
pub struct ExchangeGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One client request being proxied to its matched upstream.
#[derive(Debug)]
pub struct ForwardedExchange {
    id: ExchangeId,
    request_id: String,
    method: Method,
    path: String,
    peer: Option<SocketAddr>,
    binding: Arc<RouteBinding>,
    upstream: Url,
    started_at: Instant,
    state: ExchangeState,
    _guard: ExchangeGuard,
}

impl ForwardedExchange {
    /// Open an exchange for a request that matched `binding`.
    pub fn matched(
        guard: ExchangeGuard,
        request_id: String,
        method: Method,
        path: String,
        peer: Option<SocketAddr>,
        binding: Arc<RouteBinding>,
        upstream: Url,
    ) -> Self {
        let mut exchange = Self {
            id: ExchangeId::new(),
            request_id,
            method,
            path,
            peer,
            binding,
            upstream,
            started_at: Instant::now(),
            state: ExchangeState::Received,
            _guard: guard,
        };
        exchange.advance(ExchangeState::Matched);
        exchange
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: ExchangeState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                exchange = %self.id,
                from = ?self.state,
                to = ?next,
                "Ignoring illegal exchange transition"
            );
            return false;
        }
        tracing::trace!(exchange = %self.id, from = ?self.state, to = ?next, "Exchange transition");
        self.state = next;
        true
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn binding(&self) -> &Arc<RouteBinding> {
        &self.binding
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Drop for ForwardedExchange {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed().as_millis() as u64;
        if self.state.is_terminal() {
            tracing::debug!(
                exchange = %self.id,
                request_id = %self.request_id,
                state = ?self.state,
                elapsed_ms,
                "Exchange closed"
            );
        } else {
            tracing::debug!(
                exchange = %self.id,
                request_id = %self.request_id,
                state = ?self.state,
                elapsed_ms,
                "Exchange cancelled by client"
            );
        }
    }
}
