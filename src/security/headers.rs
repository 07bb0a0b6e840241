//! Header sanitation at the proxy boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from outbound requests and relayed responses
//! - Leave every other header, including repeated values, untouched
//!
//! # Design Decisions
//! - `HeaderMap` keys are case-insensitive, so `KEEP-ALIVE` and `keep-alive`
//!   are the same entry and cannot slip through
//! - The hop-by-hop set is fixed; `Connection` tokens are not expanded

use axum::http::header::{self, HeaderMap, HeaderName};

/// Headers meaningful only for a single transport connection.
pub static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    HeaderName::from_static("trailers"),
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Returns true if `name` belongs to the hop-by-hop set.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}

/// Copy `source` into a new map, dropping hop-by-hop headers.
pub fn forwardable_headers(source: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source.iter() {
        if !is_hop_by_hop(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS.iter() {
        headers.remove(name);
    }
}
