//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use api_gateway::config::{
    AuthConfig, AuthMode, GatewayConfig, RateLimitConfig, RouteConfig, StoreBackend,
};
use api_gateway::{GatewayServer, Shutdown};
use axum::body::Body;
use axum::http::Request;
use axum::routing::any;
use axum::{Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const SECRET: &str = "integration-test-secret";

/// What the echo backend saw.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echoed {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Echoed {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

async fn echo(req: Request<Body>) -> Json<Echoed> {
    let (parts, body) = req.into_parts();
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &parts.headers {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_str().unwrap_or("<binary>").to_string());
    }
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    Json(Echoed {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Start an axum backend that reflects every request as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new()
        .route("/{*path}", any(echo))
        .route("/", any(echo));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Read up to the end of the request head. `None` if the peer hung up first.
async fn read_head(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    Some(head)
}

/// Start a raw TCP backend that answers every request with `response`
/// verbatim after reading the request head.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_head(&mut socket).await.is_some() {
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
        }
    });
    addr
}

/// Like [`start_raw_backend`], but also hands each request head, exactly as
/// it arrived on the wire, to the returned receiver.
pub async fn start_capturing_backend(
    response: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(head) = read_head(&mut socket).await {
                    let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
        }
    });
    (addr, rx)
}

/// Start a backend that promises `declared` body bytes, sends only `sent`,
/// holds the socket open for `hold` and then drops it.
pub async fn start_truncating_backend(
    declared: usize,
    sent: &'static str,
    hold: Duration,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_head(&mut socket).await.is_none() {
                    return;
                }
                let response =
                    format!("HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\n\r\n{sent}");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(hold).await;
            });
        }
    });
    addr
}

/// Send `request` verbatim over a fresh connection and return everything
/// the server writes until it closes.
pub async fn raw_exchange(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("gateway did not close the connection")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Start a backend that accepts connections and waits `delay` before
/// answering 200.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let app = Router::new().route(
        "/{*path}",
        any(move || async move {
            tokio::time::sleep(delay).await;
            "late"
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Mint a token for `sub` expiring `ttl_secs` from now (negative = expired).
pub fn mint_token(algorithm: Algorithm, sub: &str, ttl_secs: i64) -> String {
    encode(
        &Header::new(algorithm),
        &json!({ "sub": sub, "exp": chrono::Utc::now().timestamp() + ttl_secs }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(sub: &str) -> String {
    format!("Bearer {}", mint_token(Algorithm::HS256, sub, 600))
}

/// Config with an in-memory counter store and the given routes.
pub fn config(routes: Vec<(&str, SocketAddr, AuthMode)>, limit: u64) -> GatewayConfig {
    GatewayConfig {
        routes: routes
            .into_iter()
            .map(|(prefix, addr, auth)| RouteConfig {
                prefix: prefix.to_string(),
                backend: format!("http://{addr}"),
                auth,
            })
            .collect(),
        auth: AuthConfig {
            secret: SECRET.to_string(),
            ..AuthConfig::default()
        },
        rate_limit: RateLimitConfig {
            limit,
            backend: StoreBackend::Memory,
            ..RateLimitConfig::default()
        },
        ..GatewayConfig::default()
    }
}

/// A gateway served on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let server = GatewayServer::new(&config).unwrap();
    start_server(server).await
}

pub async fn start_server(server: GatewayServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    TestGateway { addr, shutdown }
}

/// HTTP client that ignores proxy settings from the environment.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
