//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): by method, status, cache outcome
//! - `proxy_upstream_duration_seconds` (histogram): upstream call latency
//! - `proxy_cache_entries` (gauge): entries held by the store
//! - `proxy_cache_evictions_total` (counter): by reason (expired, reaped, invalidated)
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, cache: &'static str) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "cache" => cache
    )
    .increment(1);
}

pub fn record_upstream_duration(start: Instant) {
    histogram!("proxy_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_size(entries: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
}

pub fn record_cache_eviction(reason: &'static str, count: u64) {
    counter!("proxy_cache_evictions_total", "reason" => reason).increment(count);
}
