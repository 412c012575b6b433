//! Upstream forwarding.
//!
//! # Responsibilities
//! - Drop connection-specific request headers before replay
//! - Enforce the upstream deadline
//! - Classify outcomes: < 500 is a result, 5xx and transport failures are errors
//!
//! # Design Decisions
//! - Single attempt per request; no retries
//! - A timed-out call only resolves to an error, it never touches the cache

use axum::http::{header, HeaderMap, Method};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

use crate::observability::metrics;
use crate::proxy::error::{TransportError, UpstreamError};
use crate::proxy::upstream::{UpstreamClient, UpstreamRequest, UpstreamResponse};

/// Request headers never replayed to the origin; the transport recomputes them.
pub const STRIPPED_REQUEST_HEADERS: [header::HeaderName; 3] =
    [header::HOST, header::CONNECTION, header::CONTENT_LENGTH];

/// Default upstream deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Clone)]
pub struct Forwarder {
    client: Arc<dyn UpstreamClient>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: Arc<dyn UpstreamClient>, timeout_ms: u64) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Perform one upstream call.
    pub async fn forward(
        &self,
        method: Method,
        url: Url,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = UpstreamRequest {
            method,
            url,
            headers: sanitize_headers(headers),
            body,
        };

        tracing::debug!(method = %request.method, url = %request.url, "Forwarding to upstream");

        let start = Instant::now();
        let result = match timeout(self.timeout, self.client.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout.as_millis() as u64)),
        };
        metrics::record_upstream_duration(start);

        let response = result?;
        if response.status.is_server_error() {
            return Err(UpstreamError::from_status(response.status));
        }
        Ok(response)
    }
}

/// Copy of `headers` without the connection-specific entries.
pub fn sanitize_headers(headers: &HeaderMap) -> HeaderMap {
    let mut sanitized = headers.clone();
    for name in STRIPPED_REQUEST_HEADERS.iter() {
        sanitized.remove(name);
    }
    sanitized
}
