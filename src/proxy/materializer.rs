//! Response materialization.
//!
//! # Responsibilities
//! - Normalise an upstream response into one shape used for both the
//!   immediate reply and the cache
//! - Decode JSON bodies for inspection; replay every body as the exact
//!   upstream bytes
//! - Render that shape, plus a fresh `X-Cache` header, into the outgoing reply
//!
//! # Design Decisions
//! - Framing and hop-by-hop headers are dropped at materialization time, so a
//!   replayed entry carries exactly the headers of the first reply
//! - `X-Cache` is never stored

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::proxy::error::{ErrorBody, UpstreamError};
use crate::proxy::upstream::UpstreamResponse;

pub const X_CACHE: &str = "x-cache";

/// Response headers that describe the upstream connection rather than the resource.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "content-length",
    "upgrade",
    "te",
    "trailer",
];

/// Value of the `X-Cache` observability header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
    NoCache,
    Invalidated,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
            CacheStatus::NoCache => "NOCACHE",
            CacheStatus::Invalidated => "INVALIDATED",
        }
    }
}

/// Stored body representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// JSON payload: the parsed document plus the bytes the origin sent.
    Json { value: serde_json::Value, raw: Bytes },
    /// Anything else, byte for byte.
    Raw(Bytes),
}

impl ResponseBody {
    /// Parsed document, for JSON bodies.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json { value, .. } => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// Bytes sent to the caller. Never re-encoded, so upstream validators
    /// such as `ETag` keep describing the payload.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            ResponseBody::Json { raw, .. } | ResponseBody::Raw(raw) => raw.clone(),
        }
    }
}

/// Cacheable shape of an upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl CachedResponse {
    /// Whether this response may be stored.
    pub fn is_cacheable(&self) -> bool {
        self.status.as_u16() < 400
    }

    /// Outgoing reply for this response tagged with `cache_status`.
    pub fn to_outgoing(&self, cache_status: CacheStatus) -> ProxyResponse {
        let mut headers = self.headers.clone();
        headers.insert(HeaderName::from_static(X_CACHE), HeaderValue::from_static(cache_status.as_str()));

        ProxyResponse {
            status: self.status,
            headers,
            body: self.body.to_bytes(),
        }
    }
}

/// Normalise an upstream response.
pub fn materialize(upstream: UpstreamResponse) -> CachedResponse {
    let UpstreamResponse { status, mut headers, body } = upstream;

    for name in HOP_BY_HOP {
        headers.remove(name);
    }

    let body = if is_json(&headers) {
        match serde_json::from_slice(&body) {
            Ok(value) => ResponseBody::Json { value, raw: body },
            Err(e) => {
                tracing::debug!(error = %e, "JSON content type with undecodable body, keeping raw bytes");
                ResponseBody::Raw(body)
            }
        }
    } else {
        ResponseBody::Raw(body)
    };

    CachedResponse { status, headers, body }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Reply handed back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    /// `{ "error": message }` reply for a failed upstream call.
    pub fn from_upstream_error(error: &UpstreamError, cache_status: CacheStatus) -> Self {
        let (status, message) = error.reply_parts();
        let body = serde_json::to_vec(&ErrorBody { error: message.to_string() })
            .map(Bytes::from)
            .unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(X_CACHE), HeaderValue::from_static(cache_status.as_str()));

        Self { status, headers, body }
    }

    pub fn cache_status(&self) -> Option<&str> {
        self.headers.get(X_CACHE).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
