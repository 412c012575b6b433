//! In-memory TTL store.
//!
//! # Responsibilities
//! - Keyed get/set/delete/flush with per-entry TTL
//! - Lazy expiry on read (authoritative)
//! - Background reaper bounding memory held by entries never read again

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::cache::key::CacheKey;
use crate::observability::metrics;

/// A stored value together with its retention window.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Hit/miss counters as observed by `get`.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe TTL cache.
///
/// Clones share the same underlying map. A miss, an expired entry and a
/// never-set key all read as `None`; the store itself never fails.
#[derive(Debug, Clone)]
pub struct CacheStore<V> {
    inner: Arc<DashMap<CacheKey, CacheEntry<V>>>,
    counters: Arc<Counters>,
    default_ttl: Duration,
}

impl<V: Clone + Send + Sync + 'static> CacheStore<V> {
    /// Create an empty store. `default_ttl_secs` applies when `set` is given
    /// no TTL or a TTL of zero.
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            default_ttl: Duration::from_secs(default_ttl_secs),
        }
    }

    /// Fetch a live entry's value.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        // The read guard is dropped at the end of this statement; removing
        // while holding it would deadlock on the shard lock.
        let found = self
            .inner
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone());

        if found.is_none() && self.inner.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            metrics::record_cache_eviction("expired", 1);
            metrics::record_cache_size(self.inner.len());
        }

        let counter = if found.is_some() { &self.counters.hits } else { &self.counters.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `value`, replacing whatever was at `key`.
    pub fn set(&self, key: CacheKey, value: V, ttl_secs: Option<u64>) {
        let ttl = match ttl_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => self.default_ttl,
        };

        self.inner.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        metrics::record_cache_size(self.inner.len());
    }

    /// Remove the entry at `key`, if any.
    pub fn delete(&self, key: &CacheKey) {
        if self.inner.remove(key).is_some() {
            metrics::record_cache_eviction("invalidated", 1);
            metrics::record_cache_size(self.inner.len());
        }
    }

    /// Empty the store. Returns the number of entries dropped.
    pub fn flush_all(&self) -> usize {
        let dropped = self.inner.len();
        self.inner.clear();
        metrics::record_cache_size(0);
        tracing::info!(dropped, "Cache flushed");
        dropped
    }

    /// Evict every expired entry. Returns the number evicted.
    pub fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let evicted = before.saturating_sub(self.inner.len());

        if evicted > 0 {
            metrics::record_cache_eviction("reaped", evicted as u64);
            metrics::record_cache_size(self.inner.len());
        }
        evicted
    }

    /// Number of entries currently held, expired-but-unreaped included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }

    /// Spawn the background reaper. It stops when `shutdown` fires.
    pub fn spawn_reaper(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let store = self.clone();

        tokio::spawn(async move {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Cache reaper starting");

            let mut ticker = time::interval(interval);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = store.reap_expired();
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = store.len(), "Reaped expired cache entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Cache reaper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> CacheKey {
        CacheKey::from(raw)
    }

    #[test]
    fn test_store_operations() {
        let store: CacheStore<String> = CacheStore::new(60);
        let k = key("http://a/");

        assert!(store.get(&k).is_none());

        store.set(k.clone(), "first".into(), None);
        assert_eq!(store.get(&k).as_deref(), Some("first"));

        // Overwrite supersedes
        store.set(k.clone(), "second".into(), Some(30));
        assert_eq!(store.get(&k).as_deref(), Some("second"));
        assert_eq!(store.len(), 1);

        store.delete(&k);
        assert!(store.get(&k).is_none());

        // Deleting an absent key is a no-op
        store.delete(&k);
    }

    #[test]
    fn test_flush_all() {
        let store: CacheStore<u32> = CacheStore::new(60);
        store.set(key("a"), 1, None);
        store.set(key("b"), 2, None);

        assert_eq!(store.flush_all(), 2);
        assert!(store.is_empty());
        assert!(store.get(&key("a")).is_none());
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let store: CacheStore<u32> = CacheStore::new(60);
        store.set(key("a"), 1, None);

        store.get(&key("a"));
        store.get(&key("a"));
        store.get(&key("missing"));

        let stats = store.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_lazy() {
        let store: CacheStore<u32> = CacheStore::new(60);
        store.set(key("short"), 1, Some(1));
        store.set(key("long"), 2, None);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        // No reaper running: the read itself must treat it as absent.
        assert!(store.get(&key("short")).is_none());
        assert_eq!(store.get(&key("long")), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_default() {
        let store: CacheStore<u32> = CacheStore::new(3600);
        store.set(key("a"), 1, Some(0));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get(&key("a")), Some(1));
    }

    #[tokio::test]
    async fn test_reaper_evicts_unread_entries() {
        let store: CacheStore<u32> = CacheStore::new(60);
        store.set(key("stale"), 1, Some(1));
        store.set(key("fresh"), 2, None);

        let (tx, rx) = broadcast::channel(1);
        let handle = store.spawn_reaper(Duration::from_millis(100), rx);

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("fresh")), Some(2));

        let _ = tx.send(());
        handle.await.unwrap();
    }
}
