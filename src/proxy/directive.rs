//! Per-request cache directives.
//!
//! # Evaluation order (first match wins)
//! 1. `cache-control: no-cache`   → Bypass  (skip read, allow write)
//! 2. `cache-control: no-store`   → NoStore (skip read, skip write)
//! 3. `x-cache-invalidate: true`  → Invalidate (delete, then miss)
//! 4. otherwise                   → UseCache

use axum::http::HeaderMap;

pub const CACHE_CONTROL: &str = "cache-control";
pub const X_CACHE_INVALIDATE: &str = "x-cache-invalidate";

/// Caching behaviour selected for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    UseCache,
    Bypass,
    NoStore,
    Invalidate,
}

impl Directive {
    /// Read the directive from request headers. Never fails.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let cache_control = header_value(headers, CACHE_CONTROL);

        if cache_control == Some("no-cache") {
            Directive::Bypass
        } else if cache_control == Some("no-store") {
            Directive::NoStore
        } else if header_value(headers, X_CACHE_INVALIDATE) == Some("true") {
            Directive::Invalidate
        } else {
            Directive::UseCache
        }
    }

    /// Whether a stored entry may answer this request.
    pub fn reads_cache(self) -> bool {
        matches!(self, Directive::UseCache)
    }

    /// Whether an eligible upstream response may be written back.
    pub fn writes_cache(self) -> bool {
        !matches!(self, Directive::NoStore)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
