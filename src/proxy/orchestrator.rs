//! End-to-end request lifecycle.
//!
//! # States
//! ```text
//! RECEIVED → DIRECTIVE_RESOLVED → CACHE_HIT  → RESPONDED
//!                               → FORWARDING → RESPONDED
//! ```
//!
//! - CACHE_HIT only for `UseCache` with a live entry; no network call
//! - FORWARDING for every other directive, or a `UseCache` miss
//! - Store write happens before RESPONDED, only if the directive allows it
//!   and the upstream status is below 400
//!
//! Validation (missing or malformed target) happens before RECEIVED, in the
//! HTTP layer, so invalid requests never reach this type.

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use std::sync::Arc;

use crate::cache::{CacheKey, CacheStats, CacheStore};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::proxy::directive::Directive;
use crate::proxy::error::TransportError;
use crate::proxy::forwarder::Forwarder;
use crate::proxy::materializer::{materialize, CacheStatus, CachedResponse, ProxyResponse};
use crate::proxy::target::Target;
use crate::proxy::upstream::{HttpUpstream, UpstreamClient};

/// Normalised inbound request, produced by the HTTP layer.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub target: Target,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Per-request TTL override in seconds; `None` or 0 uses the default.
    pub ttl_secs: Option<u64>,
}

/// The caching proxy: owns its store and its forwarder.
#[derive(Clone)]
pub struct CachingProxy {
    store: CacheStore<CachedResponse>,
    forwarder: Forwarder,
    default_method: Method,
}

impl CachingProxy {
    pub fn new(store: CacheStore<CachedResponse>, forwarder: Forwarder, default_method: Method) -> Self {
        Self {
            store,
            forwarder,
            default_method,
        }
    }

    /// Build a proxy from configuration with the given upstream client.
    pub fn with_client(config: &ProxyConfig, client: Arc<dyn UpstreamClient>) -> Self {
        let default_method = Method::from_bytes(config.cache.default_method.to_ascii_uppercase().as_bytes())
            .unwrap_or(Method::GET);

        Self::new(
            CacheStore::new(config.cache.default_ttl_secs),
            Forwarder::new(client, config.upstream.timeout_ms),
            default_method,
        )
    }

    /// Build a proxy from configuration using the network client.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, TransportError> {
        let client = HttpUpstream::new(&config.upstream)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn store(&self) -> &CacheStore<CachedResponse> {
        &self.store
    }

    /// Flush the whole store. Returns the number of entries dropped.
    pub fn clear_cache(&self) -> usize {
        self.store.flush_all()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn key_for(&self, target: &Target, method: &Method) -> CacheKey {
        CacheKey::build(target.as_str(), method, &self.default_method)
    }

    /// Run one request through the cache and, when needed, the origin.
    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
        let key = self.key_for(&request.target, &request.method);
        let directive = Directive::from_headers(&request.headers);

        let cache_status = match directive {
            Directive::UseCache => match self.store.get(&key) {
                Some(cached) => {
                    tracing::debug!(key = %key, "Cache hit");
                    let response = cached.to_outgoing(CacheStatus::Hit);
                    metrics::record_request(request.method.as_str(), response.status.as_u16(), CacheStatus::Hit.as_str());
                    return response;
                }
                None => CacheStatus::Miss,
            },
            Directive::Bypass => CacheStatus::Bypass,
            Directive::NoStore => CacheStatus::NoCache,
            Directive::Invalidate => {
                // Deleted up front, whatever the forward's outcome.
                self.store.delete(&key);
                CacheStatus::Invalidated
            }
        };

        tracing::debug!(key = %key, directive = ?directive, cache = cache_status.as_str(), "Forwarding request");

        let method = request.method.clone();
        let outcome = self
            .forwarder
            .forward(request.method, request.target.url().clone(), &request.headers, request.body)
            .await;

        let response = match outcome {
            Ok(upstream) => {
                let cached = materialize(upstream);
                let response = cached.to_outgoing(cache_status);

                if directive.writes_cache() && cached.is_cacheable() {
                    self.store.set(key, cached, request.ttl_secs);
                }
                response
            }
            Err(e) => {
                tracing::error!(url = %request.target.url(), error = %e, "Proxy error");
                ProxyResponse::from_upstream_error(&e, cache_status)
            }
        };

        metrics::record_request(method.as_str(), response.status.as_u16(), cache_status.as_str());
        response
    }
}
