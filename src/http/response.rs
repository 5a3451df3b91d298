//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream responses to the client
//! - Build the client's `101 Switching Protocols` for upgrades
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped; hyper re-frames the body for the client
//! - Status, end-to-end headers and body bytes pass through unchanged

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use crate::http::request::strip_hop_by_hop;

/// Convert an upstream response into a streamed client response.
pub fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// The client-facing half of a completed upgrade handshake.
pub fn switching_protocols(upstream_headers: &HeaderMap) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    *response.headers_mut() = upstream_headers.clone();
    response
}
