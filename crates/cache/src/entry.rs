//! Cache entry representation and statistics

use contaflux_core::time;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Entry priority, recorded at write time. The memory tier evicts
/// lower priorities first, insertion order breaking ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// The persisted form of a cache entry.
///
/// Both persistent tiers store this shape as JSON: the payload plus its
/// own creation timestamp and lifetime, since neither tier has native
/// expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Opaque JSON payload
    pub data: serde_json::Value,
    /// Creation instant, ms since the Unix epoch
    pub timestamp: u64,
    /// Lifetime in ms; expired when `now - timestamp > ttl`
    pub ttl: u64,
    /// Labels for group invalidation, immutable after write
    #[serde(default)]
    pub tags: Vec<String>,
}

impl StoredEntry {
    pub fn new(data: serde_json::Value, ttl: Duration, tags: Vec<String>) -> Self {
        Self {
            data,
            timestamp: time::epoch_ms(),
            ttl: ttl.as_millis() as u64,
            tags,
        }
    }

    pub fn is_expired(&self) -> bool {
        time::is_expired(self.timestamp, Duration::from_millis(self.ttl))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Snapshot of memory-tier statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub item_count: usize,
}

impl CacheStats {
    /// Hits over total accesses, 0.0 before any access.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_entry_is_not_expired() {
        let entry = StoredEntry::new(json!({"nome": "Acme"}), Duration::from_secs(3600), vec![]);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_backdated_entry_expires() {
        let mut entry = StoredEntry::new(json!(1), Duration::from_millis(100), vec![]);
        entry.timestamp -= 200;
        assert!(entry.is_expired());
    }

    #[test]
    fn test_tag_membership() {
        let entry = StoredEntry::new(
            json!(null),
            Duration::from_secs(1),
            vec!["das".into(), "empresa:42".into()],
        );
        assert!(entry.has_tag("das"));
        assert!(entry.has_tag("empresa:42"));
        assert!(!entry.has_tag("empresa:7"));
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stored_entry_round_trips_as_json() {
        let entry = StoredEntry::new(json!({"valor": 123.45}), Duration::from_secs(60), vec![]);
        let text = serde_json::to_string(&entry).unwrap();
        let back: StoredEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back.data, entry.data);
        assert_eq!(back.ttl, entry.ttl);
    }
}
