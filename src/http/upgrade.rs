//! Protocol-upgrade (WebSocket) proxying.
//!
//! # Responsibilities
//! - Replay the client's upgrade handshake against the upstream
//! - Hand the upstream's `101` back to the client
//! - Relay raw bytes in both directions until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Byte-level relay; frames are not parsed, so any upgraded protocol works
//! - The binding timeout bounds the handshake only, never the open relay
//! - One copy per direction; EOF or an I/O error in either one drops both
//!   sockets, so neither side is left half-open
//! - Interruptions are normal ends, except when nothing was relayed yet
//! - An upstream that declines the upgrade is relayed as a normal response

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{error_chain, ProxyError};
use crate::http::exchange::{ExchangeState, ForwardedExchange};
use crate::http::forward::{await_response_head, fail, record_failure};
use crate::http::{request, response};
use crate::observability::DiagnosticsSink;

const RELAY_BUFFER_SIZE: usize = 8 * 1024;

/// Proxy an upgrade handshake, then spawn the duplex relay.
pub async fn forward_upgrade(
    mut exchange: ForwardedExchange,
    client: &reqwest::Client,
    mut req: Request<Body>,
    sink: Arc<dyn DiagnosticsSink>,
) -> Response {
    let client_upgrade = hyper::upgrade::on(&mut req);
    let headers = request::upstream_headers(req.headers(), exchange.binding(), true);

    let handshake = client
        .request(req.method().clone(), exchange.upstream().clone())
        .headers(headers);

    exchange.advance(ExchangeState::Forwarding);
    tracing::info!(
        exchange = %exchange.id(),
        request_id = %exchange.request_id(),
        route = %exchange.binding().name(),
        path = %exchange.path(),
        upstream = %exchange.upstream(),
        "Upgrade handshake"
    );

    let upstream = match await_response_head(&exchange, handshake.send()).await {
        Ok(upstream) => upstream,
        Err(err) => {
            let err = match err {
                ProxyError::UpstreamUnreachable { target, message } => {
                    ProxyError::UpgradeFailed { target, message }
                }
                other => other,
            };
            return fail(&mut exchange, err, sink.as_ref());
        }
    };

    if upstream.status() != StatusCode::SWITCHING_PROTOCOLS {
        tracing::info!(
            exchange = %exchange.id(),
            status = %upstream.status(),
            "Upstream declined upgrade"
        );
        exchange.advance(ExchangeState::Completed);
        return response::relay_response(upstream);
    }

    let client_response = response::switching_protocols(upstream.headers());
    tokio::spawn(relay(exchange, client_upgrade, upstream, sink));
    client_response
}

/// Run the duplex relay once both sides have switched protocols.
async fn relay(
    mut exchange: ForwardedExchange,
    client_upgrade: OnUpgrade,
    upstream: reqwest::Response,
    sink: Arc<dyn DiagnosticsSink>,
) {
    let upgraded = tokio::try_join!(
        async { client_upgrade.await.map_err(|e| error_chain(&e)) },
        async { upstream.upgrade().await.map_err(|e| error_chain(&e)) },
    );

    let (client_io, upstream_io) = match upgraded {
        Ok(pair) => pair,
        Err(message) => {
            let err = ProxyError::UpgradeFailed {
                target: exchange.binding().target().to_string(),
                message,
            };
            record_failure(&mut exchange, &err, sink.as_ref());
            return;
        }
    };

    tracing::debug!(exchange = %exchange.id(), "Upgraded connection open");
    let (mut client_read, mut client_write) = tokio::io::split(TokioIo::new(client_io));
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream_io);

    let mut to_upstream = 0u64;
    let mut to_client = 0u64;
    let outcome = tokio::select! {
        result = pump(&mut client_read, &mut upstream_write, &mut to_upstream) => result,
        result = pump(&mut upstream_read, &mut client_write, &mut to_client) => result,
    };
    drop((client_read, client_write, upstream_read, upstream_write));

    let elapsed_ms = exchange.elapsed().as_millis() as u64;
    match outcome {
        Ok(()) => {
            tracing::debug!(
                exchange = %exchange.id(),
                to_upstream,
                to_client,
                elapsed_ms,
                "Upgraded connection closed"
            );
        }
        Err(e) if to_upstream == 0 && to_client == 0 => {
            let err = ProxyError::RelayInterrupted(e);
            tracing::warn!(
                exchange = %exchange.id(),
                route = %exchange.binding().name(),
                error = %err,
                elapsed_ms,
                "Upgraded connection dropped before any bytes were relayed"
            );
        }
        Err(e) => {
            let err = ProxyError::RelayInterrupted(e);
            tracing::debug!(
                exchange = %exchange.id(),
                to_upstream,
                to_client,
                error = %err,
                "Upgraded connection interrupted"
            );
        }
    }
    exchange.advance(ExchangeState::Completed);
}

/// Copy one direction until EOF, counting the bytes delivered.
async fn pump<R, W>(reader: &mut R, writer: &mut W, relayed: &mut u64) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            let _ = writer.shutdown().await;
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        *relayed += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Reader whose peer reset the connection.
    struct Reset;

    impl AsyncRead for Reset {
        fn poll_read(self: Pin<&mut Self>, _: &mut Context<'_>, _: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::ConnectionReset.into()))
        }
    }

    #[tokio::test]
    async fn pump_counts_bytes_until_eof() {
        let mut reader: &[u8] = b"hello upstream";
        let mut writer = Vec::new();
        let mut relayed = 0;

        pump(&mut reader, &mut writer, &mut relayed).await.unwrap();
        assert_eq!(writer, b"hello upstream");
        assert_eq!(relayed, 14);
    }

    #[tokio::test]
    async fn pump_keeps_count_when_interrupted() {
        let mut reader = (&b"abc"[..]).chain(Reset);
        let mut writer = Vec::new();
        let mut relayed = 0;

        let err = pump(&mut reader, &mut writer, &mut relayed).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(relayed, 3);
    }

    #[tokio::test]
    async fn pump_reports_interruption_before_any_bytes() {
        let mut writer = Vec::new();
        let mut relayed = 0;

        assert!(pump(&mut Reset, &mut writer, &mut relayed).await.is_err());
        assert_eq!(relayed, 0);
    }
}
