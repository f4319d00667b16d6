//! Capacity-bounded in-memory cache tier.
//!
//! Synchronous and total: no operation here suspends or fails. Eviction
//! removes the lowest-priority entry, oldest insertion first among ties
//! (a re-`set` moves the key to the back). Expiration is lazy: an
//! expired entry is deleted by the read that discovers it.

use crate::entry::{CacheStats, Priority, StoredEntry};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default capacity for the unified-service memory tier
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct MemoryEntry {
    stored: StoredEntry,
    priority: Priority,
    hit_count: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, MemoryEntry>,
    /// Insertion-order ledger; front is the eviction candidate
    order: VecDeque<String>,
}

/// In-process memory tier with per-entry TTL, tags and hit/miss counters.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the payload if present and unexpired. A read past the
    /// expiry boundary deletes the entry and counts as a miss.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.stored.is_expired(),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let entry = inner.entries.get_mut(key)?;
        entry.hit_count += 1;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.stored.data.clone())
    }

    /// Full replace; resets the hit count and moves the key to the back
    /// of the eviction ledger.
    pub fn set(
        &self,
        key: &str,
        data: serde_json::Value,
        ttl: Duration,
        tags: Vec<String>,
        priority: Priority,
    ) {
        self.insert_stored(key, StoredEntry::new(data, ttl, tags), priority);
    }

    /// Insert an entry that already carries its timestamp, preserving
    /// residual freshness. Used when promoting hits from slower tiers.
    pub fn insert_stored(&self, key: &str, stored: StoredEntry, priority: Priority) {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(key) {
            inner.order.retain(|k| k != key);
        } else if inner.entries.len() >= self.capacity {
            // Lowest priority goes first, oldest insertion breaks ties.
            // Never a random entry.
            let victim = inner
                .order
                .iter()
                .enumerate()
                .min_by_key(|(position, k)| {
                    let priority = inner
                        .entries
                        .get(*k)
                        .map(|e| e.priority)
                        .unwrap_or(Priority::Low);
                    (priority, *position)
                })
                .map(|(_, k)| k.clone());
            if let Some(victim) = victim {
                inner.order.retain(|k| k != &victim);
                if inner.entries.remove(&victim).is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        inner.order.push_back(key.to_string());
        inner.entries.insert(
            key.to_string(),
            MemoryEntry {
                stored,
                priority,
                hit_count: 0,
            },
        );
    }

    /// Fetch the stored form without touching counters or hit counts.
    /// Used by the unified service when fanning a hit down is needed.
    pub fn peek_stored(&self, key: &str) -> Option<StoredEntry> {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .filter(|e| !e.stored.is_expired())
            .map(|e| e.stored.clone())
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.order.retain(|k| k != key);
        }
        removed
    }

    /// Remove every entry whose tag set contains `tag`.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.stored.has_tag(tag))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &doomed {
            inner.entries.remove(key);
        }
        inner.order.retain(|k| !doomed.contains(k));
        doomed.len()
    }

    /// Drop all entries and reset counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            item_count: self.len(),
        }
    }

    #[cfg(test)]
    fn hit_count(&self, key: &str) -> Option<u64> {
        self.inner.lock().entries.get(key).map(|e| e.hit_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    fn store() -> MemoryStore {
        MemoryStore::new(3)
    }

    #[test]
    fn test_set_then_get() {
        let store = store();
        store.set("empresa:42", json!({"nome": "Acme"}), TTL, vec![], Priority::Normal);
        assert_eq!(store.get("empresa:42"), Some(json!({"nome": "Acme"})));
    }

    #[test]
    fn test_miss_counts() {
        let store = store();
        assert_eq!(store.get("absent"), None);
        store.set("k", json!(1), TTL, vec![], Priority::Normal);
        store.get("k");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expired_read_deletes_once() {
        let store = store();
        let mut stored = StoredEntry::new(json!(1), Duration::from_millis(10), vec![]);
        stored.timestamp -= 100; // already past the boundary
        store.insert_stored("stale", stored, Priority::Normal);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("stale"), None);
        assert_eq!(store.len(), 0);
        // Idempotent thereafter
        assert_eq!(store.get("stale"), None);
        assert_eq!(store.stats().misses, 2);
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let store = store();
        store.set("a", json!(1), TTL, vec![], Priority::Normal);
        store.set("b", json!(2), TTL, vec![], Priority::Normal);
        store.set("c", json!(3), TTL, vec![], Priority::Normal);
        store.set("d", json!(4), TTL, vec![], Priority::Normal);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("d"), Some(json!(4)));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_low_priority_is_evicted_before_older_normal_entries() {
        let store = store();
        store.set("old", json!(1), TTL, vec![], Priority::Normal);
        store.set("scratch", json!(2), TTL, vec![], Priority::Low);
        store.set("das", json!(3), TTL, vec![], Priority::High);
        store.set("new", json!(4), TTL, vec![], Priority::Normal);

        assert_eq!(store.get("scratch"), None);
        assert_eq!(store.get("old"), Some(json!(1)));
        assert_eq!(store.get("das"), Some(json!(3)));
    }

    #[test]
    fn test_reset_moves_key_to_back() {
        let store = store();
        store.set("a", json!(1), TTL, vec![], Priority::Normal);
        store.set("b", json!(2), TTL, vec![], Priority::Normal);
        store.set("c", json!(3), TTL, vec![], Priority::Normal);
        // Re-set "a": it is now the newest insertion
        store.set("a", json!(10), TTL, vec![], Priority::Normal);
        store.set("d", json!(4), TTL, vec![], Priority::Normal);

        // "b" was the oldest insertion, so it went first
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("a"), Some(json!(10)));
    }

    #[test]
    fn test_reset_clears_hit_count() {
        let store = store();
        store.set("k", json!(1), TTL, vec![], Priority::Normal);
        store.get("k");
        store.get("k");
        assert_eq!(store.hit_count("k"), Some(2));

        store.set("k", json!(2), TTL, vec![], Priority::Normal);
        assert_eq!(store.hit_count("k"), Some(0));
    }

    #[test]
    fn test_invalidate_by_tag_scope() {
        let store = store();
        store.set("x", json!(1), TTL, vec!["a".into()], Priority::Normal);
        store.set("y", json!(2), TTL, vec!["a".into(), "b".into()], Priority::Normal);
        store.set("z", json!(3), TTL, vec!["b".into()], Priority::Normal);

        assert_eq!(store.invalidate_by_tag("a"), 2);
        assert_eq!(store.get("x"), None);
        assert_eq!(store.get("y"), None);
        assert_eq!(store.get("z"), Some(json!(3)));
    }

    #[test]
    fn test_clear_resets_counters() {
        let store = store();
        store.set("k", json!(1), TTL, vec![], Priority::Normal);
        store.get("k");
        store.get("missing");
        store.clear();

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.item_count, 0);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(keys in proptest::collection::vec("[a-z]{1,8}", 0..64)) {
            let store = MemoryStore::new(5);
            for key in &keys {
                store.set(key, json!(1), TTL, vec![], Priority::Normal);
                prop_assert!(store.len() <= 5);
            }
        }

        #[test]
        fn prop_expired_entries_are_never_returned(age_ms in 0u64..200, ttl_ms in 1u64..200) {
            let store = MemoryStore::new(5);
            let mut stored = StoredEntry::new(json!(1), Duration::from_millis(ttl_ms), vec![]);
            stored.timestamp = stored.timestamp.saturating_sub(age_ms);
            store.insert_stored("k", stored, Priority::Normal);

            let result = store.get("k");
            if age_ms > ttl_ms {
                prop_assert!(result.is_none());
            } else if age_ms + 50 <= ttl_ms {
                // Leave slack near the boundary so a ticking clock
                // between insert and read cannot flip the outcome.
                prop_assert!(result.is_some());
            }
        }
    }
}
