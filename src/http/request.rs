//! Request correlation IDs.
//!
//! # Responsibilities
//! - Accept a well-formed inbound `X-Request-ID`, otherwise mint a UUID v4
//! - Expose the ID to later stages as a request extension
//! - Forward the ID upstream and echo it on the response
//!
//! # Design Decisions
//! - Caller-supplied IDs are bounded to 128 visible ASCII characters
//! - The stage runs first so every log line and error response carries it

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::Response;
use uuid::Uuid;

use crate::pipeline::{Next, Stage};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation ID for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId {
    id: String,
    header: HeaderValue,
}

impl RequestId {
    pub fn generate() -> Self {
        let id = Uuid::new_v4().to_string();
        let header = HeaderValue::from_str(&id).expect("hyphenated UUID is a valid header value");
        Self { id, header }
    }

    /// Accept a caller-supplied ID if it is safe to log and forward.
    pub fn parse(raw: &HeaderValue) -> Option<Self> {
        let value = raw.to_str().ok()?;
        let acceptable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self {
            id: value.to_string(),
            header: raw.clone(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

/// Extension trait for reading the correlation ID off a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Assigns and propagates `X-Request-ID`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdStage;

#[async_trait]
impl Stage for RequestIdStage {
    async fn handle(&self, mut req: Request<Body>, next: Next<'_>) -> Response {
        let id = req
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(RequestId::parse)
            .unwrap_or_else(RequestId::generate);
        let value = id.header_value().clone();

        tracing::Span::current().record("request_id", id.as_str());
        req.headers_mut().insert(X_REQUEST_ID.clone(), value.clone());
        req.extensions_mut().insert(id);

        let mut response = next.run(req).await;
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
        response
    }
}
