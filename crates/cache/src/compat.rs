//! Compatibility layer for pre-unification call sites.
//!
//! [`PerformanceCache`] is the old standalone memory cache that some
//! hot paths still construct directly: small (100 entries), hit-count
//! aware eviction, no tiers. [`LegacyCache`] adapts the old call shape
//! (`get/set/invalidate` without tier selection) onto [`UnifiedCache`]
//! so migrated call sites keep working unchanged.

use crate::entry::CacheStats;
use crate::unified::{CacheWriteOptions, TierConfig, UnifiedCache};
use contaflux_core::time::{epoch_ms, is_expired};
use contaflux_core::Result;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Capacity of the legacy cache
const LEGACY_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
struct LegacyEntry {
    data: Value,
    timestamp: u64,
    ttl: u64,
    hit_count: u64,
}

/// The legacy standalone memory cache.
///
/// Unlike [`MemoryStore`], eviction here picks the entry with the
/// fewest hits rather than the oldest insertion, and there are no tags.
/// Kept only for call sites not yet moved to the unified service.
///
/// [`MemoryStore`]: crate::memory::MemoryStore
#[derive(Debug)]
pub struct PerformanceCache {
    entries: Mutex<HashMap<String, LegacyEntry>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for PerformanceCache {
    fn default() -> Self {
        Self::new(LEGACY_CAPACITY)
    }
}

impl PerformanceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if !is_expired(entry.timestamp, Duration::from_millis(entry.ttl)) => {
                entry.hit_count += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.data.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, data: Value, ttl: Duration) {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            // Evict the coldest entry, the one with the fewest hits
            let coldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.hit_count)
                .map(|(key, _)| key.clone());
            if let Some(coldest) = coldest {
                entries.remove(&coldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = coldest, "evicted least-hit legacy entry");
            }
        }
        entries.insert(
            key.to_string(),
            LegacyEntry {
                data,
                timestamp: epoch_ms(),
                ttl: ttl.as_millis() as u64,
                hit_count: 0,
            },
        );
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            item_count: self.entries.lock().len(),
        }
    }
}

/// Old call shape over the unified service: no tier selection, the
/// service default TTL unless one is given.
#[derive(Debug, Clone)]
pub struct LegacyCache {
    cache: UnifiedCache,
}

impl LegacyCache {
    pub fn new(cache: UnifiedCache) -> Self {
        Self { cache }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.cache.get(key, TierConfig::default()).await
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let options = CacheWriteOptions {
            ttl,
            ..Default::default()
        };
        self.cache
            .set(key, value, options, TierConfig::default())
            .await
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key, TierConfig::default()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::NoopLocalStore;
    use crate::memory::MemoryStore;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_get_set_round_trip() {
        let cache = PerformanceCache::default();
        cache.set("k", json!({"v": 1}), TTL);
        assert_eq!(cache.get("k"), Some(json!({"v": 1})));
        assert_eq!(cache.get("missing"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_eviction_picks_least_hit_entry() {
        let cache = PerformanceCache::new(3);
        cache.set("hot", json!(1), TTL);
        cache.set("warm", json!(2), TTL);
        cache.set("cold", json!(3), TTL);

        // Touch hot twice and warm once; cold stays at zero hits
        cache.get("hot");
        cache.get("hot");
        cache.get("warm");

        cache.set("new", json!(4), TTL);

        assert_eq!(cache.get("cold"), None);
        assert!(cache.get("hot").is_some());
        assert!(cache.get("warm").is_some());
        assert!(cache.get("new").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_re_set_does_not_evict() {
        let cache = PerformanceCache::new(2);
        cache.set("a", json!(1), TTL);
        cache.set("b", json!(2), TTL);
        cache.set("a", json!(10), TTL);

        assert_eq!(cache.get("a"), Some(json!(10)));
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = PerformanceCache::default();
        cache.set("k", json!(1), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().item_count, 0);
    }

    #[tokio::test]
    async fn test_legacy_wrapper_delegates_to_unified() {
        let unified = UnifiedCache::from_parts(
            MemoryStore::new(100),
            Box::new(NoopLocalStore),
            None,
            Duration::from_secs(300),
        );
        let legacy = LegacyCache::new(unified);

        legacy.set("empresa:1", &json!({"nome": "Acme"}), None).await.unwrap();
        let value: Option<Value> = legacy.get("empresa:1").await.unwrap();
        assert_eq!(value, Some(json!({"nome": "Acme"})));

        legacy.invalidate("empresa:1").await;
        let value: Option<Value> = legacy.get("empresa:1").await.unwrap();
        assert_eq!(value, None);
    }
}
