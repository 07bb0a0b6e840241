//! Best-effort client address resolution for rate-limit keys.
//!
//! # Header Priority
//! 1. `X-Forwarded-For` (first entry of the comma-separated list)
//! 2. `X-Real-IP`
//! 3. Socket address from `ConnectInfo`
//! 4. [`UNKNOWN_IP`]
//!
//! These headers are client-controlled unless an edge proxy overwrites them.
//! Deploy behind a trusted proxy when per-IP limits matter.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Shared key for requests whose origin cannot be determined.
pub const UNKNOWN_IP: &str = "unknown";

fn header_str<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Resolve the caller's address from proxy headers or the socket.
pub fn client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    if let Some(first) = header_str(req, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return Cow::Owned(first.to_string());
    }

    if let Some(real_ip) = header_str(req, "x-real-ip") {
        return Cow::Owned(real_ip.to_string());
    }

    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => Cow::Owned(addr.ip().to_string()),
        None => Cow::Borrowed(UNKNOWN_IP),
    }
}

/// Socket address of the connection, if the server recorded it.
pub fn remote_addr<B>(req: &Request<B>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
