//! Route dispatcher.
//!
//! # Responsibilities
//! - Match each request against the route table
//! - Open an exchange and pick plain or upgrade forwarding
//! - Hand unmatched requests to the fallback router untouched
//!
//! # Design Decisions
//! - The route table is shared read-only; no locks on the request path
//! - Upgrade relay only for bindings that opted in; elsewhere an upgrade
//!   request is forwarded as a plain request without its upgrade headers
//! - Unmatched requests produce no events and open no exchange

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use crate::http::exchange::{ExchangeTracker, ForwardedExchange};
use crate::http::upstream::UpstreamClients;
use crate::http::{forward, request, upgrade};
use crate::observability::DiagnosticsSink;
use crate::routing::{RouteBinding, RouteTable};

/// Routes requests to upstreams or to the local fallback.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    clients: UpstreamClients,
    sink: Arc<dyn DiagnosticsSink>,
    fallback: Router,
    tracker: ExchangeTracker,
}

impl Dispatcher {
    /// Create a dispatcher. Fails only if an upstream client cannot be built.
    pub fn new(
        table: RouteTable,
        sink: Arc<dyn DiagnosticsSink>,
        fallback: Router,
    ) -> Result<Self, reqwest::Error> {
        let clients = UpstreamClients::new(&table)?;
        Ok(Self {
            table: Arc::new(table),
            clients,
            sink,
            fallback,
            tracker: ExchangeTracker::new(),
        })
    }

    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticsSink>) {
        self.sink = sink;
    }

    pub fn set_fallback(&mut self, fallback: Router) {
        self.fallback = fallback;
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    pub fn tracker(&self) -> &ExchangeTracker {
        &self.tracker
    }

    /// Number of exchanges currently being forwarded.
    pub fn active_exchanges(&self) -> u64 {
        self.tracker.active_count()
    }

    /// The binding that would handle `path`, if any.
    pub fn match_route(&self, path: &str) -> Option<&Arc<RouteBinding>> {
        self.table.match_path(path)
    }

    /// Handle one inbound request.
    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let path = req.uri().path().to_string();
        let Some(binding) = self.table.match_path(&path).cloned() else {
            tracing::trace!(path = %path, "No route matched, serving locally");
            return self.serve_fallback(req).await;
        };

        let upstream = binding.upstream_url(&path, req.uri().query());
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let is_upgrade = request::is_upgrade_request(req.headers());
        let client = self.clients.for_binding(&binding);

        let mut exchange = ForwardedExchange::matched(
            self.tracker.track(),
            request::request_id(req.headers()),
            req.method().clone(),
            path,
            peer,
            binding,
            upstream,
        );

        if is_upgrade && exchange.binding().supports_upgrade() {
            upgrade::forward_upgrade(exchange, client, req, self.sink.clone()).await
        } else {
            forward::forward(&mut exchange, client, req, self.sink.as_ref()).await
        }
    }

    async fn serve_fallback(&self, req: Request<Body>) -> Response {
        match self.fallback.clone().oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.table.len())
            .field("active_exchanges", &self.tracker.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::http::fallback::not_found_router;
    use crate::observability::TracingSink;

    fn dispatcher() -> Dispatcher {
        let table = RouteTable::from_config(&ProxyConfig::default().routes).unwrap();
        Dispatcher::new(table, Arc::new(TracingSink), not_found_router()).unwrap()
    }

    #[test]
    fn matches_through_the_table() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.match_route("/api/chats").unwrap().name(), "api");
        assert!(dispatcher.match_route("/_app/immutable/start.js").is_none());
        assert_eq!(dispatcher.active_exchanges(), 0);
    }

    #[tokio::test]
    async fn unmatched_request_opens_no_exchange() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .dispatch(Request::get("/favicon.png").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
        assert_eq!(dispatcher.active_exchanges(), 0);
    }
}
