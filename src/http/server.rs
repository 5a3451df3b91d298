//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the route table and build the dispatcher
//! - Create the Axum router and wire up middleware (tracing, request ID)
//! - Bind the server to a listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, ProxyConfig};
use crate::http::dispatcher::Dispatcher;
use crate::http::fallback::fallback_router;
use crate::observability::{DiagnosticsSink, TracingSink};
use crate::routing::RouteTable;

/// HTTP server for the development proxy.
pub struct HttpServer {
    config: ProxyConfig,
    dispatcher: Dispatcher,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Events go to a [`TracingSink`] and unmatched paths to the configured
    /// fallback until replaced.
    pub fn new(config: ProxyConfig) -> crate::Result<Self> {
        let table = RouteTable::from_config(&config.routes).map_err(ConfigError::Validation)?;
        let fallback = fallback_router(&config.fallback);
        let dispatcher = Dispatcher::new(table, Arc::new(TracingSink), fallback)?;

        Ok(Self { config, dispatcher })
    }

    /// Send diagnostic events to `sink` instead.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.dispatcher.set_sink(sink);
        self
    }

    /// Serve unmatched paths with `fallback` instead.
    pub fn with_fallback(mut self, fallback: Router) -> Self {
        self.dispatcher.set_fallback(fallback);
        self
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The Axum router with all middleware layers.
    pub fn into_router(self) -> Router {
        build_router(Arc::new(self.dispatcher))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let tracker = self.dispatcher.tracker().clone();
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.route_table().len(),
            "HTTP server starting"
        );
        for route in self.dispatcher.route_table().routes() {
            tracing::info!(
                route = %route.name(),
                prefix = %route.path_prefix(),
                target = %route.target(),
                "Proxy route"
            );
        }

        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(open_exchanges = tracker.active_count(), "HTTP server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("bind_address", &self.config.listener.bind_address)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/{*path}", any(proxy_handler))
        .route("/", any(proxy_handler))
        .with_state(dispatcher)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn proxy_handler(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::observability::ChannelSink;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[test]
    fn rejects_shadowed_routes() {
        let route = |prefix: &str| RouteConfig {
            name: None,
            path_prefix: prefix.into(),
            target: "http://127.0.0.1:1".into(),
            rewrite_origin: false,
            allow_insecure_tls: false,
            timeout_ms: 0,
            supports_upgrade: false,
        };
        let config = ProxyConfig {
            routes: vec![route("/api"), route("/api/v2")],
            ..ProxyConfig::default()
        };

        let err = HttpServer::new(config).unwrap_err();
        assert!(matches!(err, crate::Error::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn unmatched_path_goes_to_fallback_without_events() {
        let (sink, mut events) = ChannelSink::new();
        let router = HttpServer::new(ProxyConfig::default())
            .unwrap()
            .with_sink(Arc::new(sink))
            .with_fallback(Router::new().fallback(|| async { "client app" }))
            .into_router();

        let response = router
            .oneshot(
                Request::get("/some/client/asset.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"client app");
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn debug_output_names_listener_and_routes() {
        let server = HttpServer::new(ProxyConfig::default()).unwrap();
        let debug = format!("{server:?}");
        assert!(debug.contains("0.0.0.0:5173"), "{debug}");
        assert!(debug.contains("routes: 6"), "{debug}");
    }

    #[tokio::test]
    async fn root_path_is_dispatched() {
        let router = HttpServer::new(ProxyConfig::default()).unwrap().into_router();
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
