//! Single request/response forwarding.
//!
//! # Responsibilities
//! - Send the client request to the bound upstream
//! - Apply the binding's response-head deadline
//! - Relay the upstream response, or turn the failure into a gateway status
//!
//! # Design Decisions
//! - The deadline covers connect + response head only; bodies stream freely
//! - Dropping the handler future (client went away) drops the upstream request
//! - Every failure ends in exactly one `UpstreamError` event

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::error::{error_chain, ProxyError};
use crate::http::exchange::{ExchangeState, ForwardedExchange};
use crate::http::{request, response};
use crate::observability::{DiagnosticsSink, ProxyEvent};

/// Forward a plain (non-upgrade) request and relay the response.
pub async fn forward(
    exchange: &mut ForwardedExchange,
    client: &reqwest::Client,
    req: Request<Body>,
    sink: &dyn DiagnosticsSink,
) -> Response {
    let (parts, body) = req.into_parts();
    let headers = request::upstream_headers(&parts.headers, exchange.binding(), false);

    let mut upstream_req = client
        .request(parts.method, exchange.upstream().clone())
        .headers(headers);
    if request::has_body(&parts.headers) {
        upstream_req = upstream_req.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    exchange.advance(ExchangeState::Forwarding);
    sink.emit(ProxyEvent::RequestStarted {
        route: exchange.binding().name().to_string(),
        method: exchange.method().to_string(),
        path: exchange.path().to_string(),
    });
    tracing::debug!(
        exchange = %exchange.id(),
        request_id = %exchange.request_id(),
        method = %exchange.method(),
        path = %exchange.path(),
        peer = ?exchange.peer(),
        upstream = %exchange.upstream(),
        "Forwarding request"
    );

    let result = await_response_head(exchange, upstream_req.send()).await;
    match result {
        Ok(upstream) => {
            exchange.advance(ExchangeState::Completed);
            tracing::debug!(
                exchange = %exchange.id(),
                request_id = %exchange.request_id(),
                status = %upstream.status(),
                elapsed_ms = exchange.elapsed().as_millis() as u64,
                "Upstream responded"
            );
            response::relay_response(upstream)
        }
        Err(err) => fail(exchange, err, sink),
    }
}

/// Wait for the upstream response head, bounded by the binding's timeout.
pub(crate) async fn await_response_head<F>(
    exchange: &ForwardedExchange,
    send: F,
) -> Result<reqwest::Response, ProxyError>
where
    F: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    match exchange.binding().timeout() {
        Some(limit) => match tokio::time::timeout(limit, send).await {
            Ok(result) => result.map_err(|e| unreachable_error(exchange, &e)),
            Err(_) => Err(timeout_error(exchange, limit)),
        },
        None => send.await.map_err(|e| unreachable_error(exchange, &e)),
    }
}

fn unreachable_error(exchange: &ForwardedExchange, err: &reqwest::Error) -> ProxyError {
    ProxyError::UpstreamUnreachable {
        target: exchange.binding().target().to_string(),
        message: error_chain(err),
    }
}

fn timeout_error(exchange: &ForwardedExchange, limit: Duration) -> ProxyError {
    ProxyError::UpstreamTimeout {
        target: exchange.binding().target().to_string(),
        timeout_ms: limit.as_millis() as u64,
    }
}

/// Close out a failed exchange: terminal state, log line, event.
pub(crate) fn record_failure(exchange: &mut ForwardedExchange, err: &ProxyError, sink: &dyn DiagnosticsSink) {
    let terminal = match err {
        ProxyError::UpstreamTimeout { .. } => ExchangeState::TimedOut,
        _ => ExchangeState::Errored,
    };
    exchange.advance(terminal);

    tracing::warn!(
        exchange = %exchange.id(),
        request_id = %exchange.request_id(),
        route = %exchange.binding().name(),
        path = %exchange.path(),
        status = %err.status(),
        error = %err,
        "Exchange failed"
    );

    if err.is_reportable() {
        sink.emit(ProxyEvent::UpstreamError {
            route: exchange.binding().name().to_string(),
            path: exchange.path().to_string(),
            message: err.to_string(),
        });
    }
}

/// Record a failure and answer the client with the gateway status.
pub(crate) fn fail(exchange: &mut ForwardedExchange, err: ProxyError, sink: &dyn DiagnosticsSink) -> Response {
    record_failure(exchange, &err, sink);
    err.into_response()
}
