//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use dev_proxy::config::{ProxyConfig, RouteConfig};
use dev_proxy::http::{ExchangeTracker, HttpServer};
use dev_proxy::lifecycle::Shutdown;
use dev_proxy::observability::{ChannelSink, ProxyEvent};

/// Route with defaults for everything but prefix and target.
pub fn route(prefix: &str, target: &str) -> RouteConfig {
    RouteConfig {
        name: None,
        path_prefix: prefix.into(),
        target: target.into(),
        rewrite_origin: false,
        allow_insecure_tls: false,
        timeout_ms: 0,
        supports_upgrade: false,
    }
}

/// Config with the given routes and nothing else.
pub fn config_with(routes: Vec<RouteConfig>) -> ProxyConfig {
    ProxyConfig {
        routes,
        ..ProxyConfig::default()
    }
}

/// Start the proxy on an ephemeral port with a channel sink.
pub async fn start_proxy(
    config: ProxyConfig,
) -> (
    SocketAddr,
    Shutdown,
    tokio::sync::mpsc::UnboundedReceiver<ProxyEvent>,
) {
    let (addr, shutdown, events, _) = start_tracked_proxy(config).await;
    (addr, shutdown, events)
}

/// Like [`start_proxy`], also returning the in-flight exchange counter.
pub async fn start_tracked_proxy(
    config: ProxyConfig,
) -> (
    SocketAddr,
    Shutdown,
    tokio::sync::mpsc::UnboundedReceiver<ProxyEvent>,
    ExchangeTracker,
) {
    let (sink, events) = ChannelSink::new();
    let server = HttpServer::new(config)
        .expect("valid config")
        .with_sink(Arc::new(sink));
    let tracker = server.dispatcher().tracker().clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown, events, tracker)
}

/// HTTP client that never pools or goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Read one request off the socket and return its head.
/// The body is drained so closing the socket never resets the peer.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&data).into_owned(),
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&data[..head_end]).into_owned();
    let lower = head.to_ascii_lowercase();
    let content_length = lower
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
    let chunked = lower.contains("transfer-encoding: chunked");

    loop {
        let body = &data[head_end..];
        let complete = match content_length {
            Some(len) => body.len() >= len,
            None if chunked => body.windows(5).any(|w| w == b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
    head
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a mock backend that returns a fixed response.
pub async fn start_mock_backend(status: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_head(&mut socket).await;
                respond(&mut socket, status, body).await;
            });
        }
    });
    addr
}

/// Start a backend that answers with `"<method> <path> <host>"`.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let mut lines = head.lines();
                let mut request_line = lines.next().unwrap_or_default().split(' ');
                let method = request_line.next().unwrap_or_default().to_string();
                let target = request_line.next().unwrap_or_default().to_string();
                let host = lines
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("host"))
                    .map(|(_, value)| value.trim().to_string())
                    .unwrap_or_default();

                let body = format!("{method} {target} {host}");
                respond(&mut socket, "200 OK", &body).await;
            });
        }
    });
    addr
}

/// Start a backend that answers with the raw request head it received.
pub async fn start_head_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                respond(&mut socket, "200 OK", &head).await;
            });
        }
    });
    addr
}

/// Start a backend that streams `chunks` with chunked encoding, pausing
/// between chunks.
pub async fn start_chunked_backend(chunks: &'static [&'static [u8]]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_head(&mut socket).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in chunks {
                    let mut frame = format!("{:x}\r\n", chunk.len()).into_bytes();
                    frame.extend_from_slice(chunk);
                    frame.extend_from_slice(b"\r\n");
                    if socket.write_all(&frame).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                let _ = socket.write_all(b"0\r\n\r\n").await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Start an upstream that accepts an upgrade with `101`, then reads until the
/// proxy closes the connection without ever closing its own side. The sender
/// fires once the proxy's side is gone.
pub async fn start_holding_upgrade_backend() -> (SocketAddr, tokio::sync::mpsc::UnboundedReceiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            read_head(&mut socket).await;
            let _ = socket
                .write_all(b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n")
                .await;
            let (mut read_half, write_half) = socket.into_split();
            held.push(write_half);
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while let Ok(n) = read_half.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
                let _ = closed_tx.send(());
            });
        }
    });
    (addr, closed_rx)
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Collect whatever events arrived within `wait`.
pub async fn drain_events(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<ProxyEvent>,
    wait: Duration,
) -> Vec<ProxyEvent> {
    tokio::time::sleep(wait).await;
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}
