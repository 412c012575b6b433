//! Caching decision engine and forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! HTTP layer
//!     → target.rs (validate target URL, 400 on failure)
//!     → orchestrator.rs
//!         → directive.rs (UseCache | Bypass | NoStore | Invalidate)
//!         → cache::store (lookup, invalidate)
//!         → forwarder.rs → upstream.rs (single attempt, bounded timeout)
//!         → materializer.rs (status, headers, JSON or raw body)
//!         → cache::store (write if allowed and status < 400)
//!     → ProxyResponse + X-Cache
//! ```
//!
//! # Design Decisions
//! - The store and forwarder are injected, so several proxies can share a process
//! - Concurrent misses on one key are not coalesced; last write wins
//! - Failures are concentrated at the forwarder and mapped once, in the orchestrator

pub mod directive;
pub mod error;
pub mod forwarder;
pub mod materializer;
pub mod orchestrator;
pub mod target;
pub mod upstream;

pub use directive::Directive;
pub use error::{TransportError, UpstreamError, ValidationError};
pub use forwarder::Forwarder;
pub use materializer::{CacheStatus, CachedResponse, ProxyResponse, X_CACHE};
pub use orchestrator::{CachingProxy, ProxyRequest};
pub use target::{parse_url, Target};
pub use upstream::{HttpUpstream, UpstreamClient, UpstreamRequest, UpstreamResponse};
