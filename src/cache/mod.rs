//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! request target + method
//!     → key.rs (CacheKey, literal target + optional method suffix)
//!     → store.rs (get: lazy TTL check → value | None)
//!
//! eligible upstream response
//!     → store.rs (set: overwrite, TTL or default window)
//!
//! reaper task (store.rs)
//!     → periodic sweep of expired entries
//! ```
//!
//! # Design Decisions
//! - The store knows nothing about HTTP; it is generic over the cached value
//! - Store instances are constructed and owned explicitly, never global
//! - Every operation touches one key; DashMap sharding is enough

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheEntry, CacheStats, CacheStore};
