//! Request handling and transformation.
//!
//! # Responsibilities
//! - Detect protocol-upgrade handshakes
//! - Strip hop-by-hop headers before forwarding
//! - Apply origin rewriting
//! - Read the request ID assigned by the request-id layer
//!
//! # Design Decisions
//! - End-to-end headers are forwarded untouched, including `x-request-id`
//! - Origin rewriting drops the client `Host`; the upstream client then
//!   derives it from the upstream URL
//! - Upgrade handshakes keep `Connection` and `Upgrade`
//! - The upstream client adds `Accept: */*` when the client sent none

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::routing::RouteBinding;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Headers scoped to a single transport hop.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Comma-separated tokens of every `Connection` header, lowercased.
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// True for `Connection: upgrade` + `Upgrade: <protocol>` requests.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE) && connection_tokens(headers).iter().any(|t| t == "upgrade")
}

/// Remove hop-by-hop headers, including any the `Connection` header names.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for token in connection_tokens(headers) {
        if let Ok(name) = HeaderName::from_bytes(token.as_bytes()) {
            headers.remove(name);
        }
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Headers to send upstream for a client request on `binding`.
pub fn upstream_headers(client: &HeaderMap, binding: &RouteBinding, upgrade: bool) -> HeaderMap {
    let mut headers = client.clone();

    if upgrade {
        let protocol = headers.get(header::UPGRADE).cloned();
        strip_hop_by_hop(&mut headers);
        if let Some(protocol) = protocol {
            headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
            headers.insert(header::UPGRADE, protocol);
        }
    } else {
        strip_hop_by_hop(&mut headers);
    }

    if binding.rewrites_origin() {
        headers.remove(header::HOST);
    }

    headers
}

/// Whether the client announced a request body.
pub fn has_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// The request ID assigned at the edge, or "unknown".
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
