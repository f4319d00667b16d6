//! Durable local tier: a synchronous, best-effort key-value surface.
//!
//! This tier is an optimization, never a source of correctness. Every
//! failure mode (missing blob, undecodable JSON, full disk) degrades to
//! a miss on read or a silent skip on write. Environments without a
//! client-side storage context get the no-op implementation.

use crate::entry::StoredEntry;
use contaflux_utils::atomic_file::write_atomic_string;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Key prefix namespace carried over from the legacy storage layout.
pub const DEFAULT_NAMESPACE: &str = "cache";

/// Capability interface for the durable local tier.
///
/// Synchronous by contract: implementations must not block on anything
/// slower than local disk.
pub trait LocalStore: Send + Sync {
    /// Read an entry; expired or undecodable entries are deleted and
    /// reported as absent.
    fn get(&self, key: &str) -> Option<StoredEntry>;

    /// Persist an entry; errors are swallowed (write-is-optional).
    fn set(&self, key: &str, entry: &StoredEntry);

    fn remove(&self, key: &str);

    /// Remove every entry carrying `tag`; returns the number removed.
    /// A full scan: tags are embedded in the entries, not indexed.
    fn invalidate_by_tag(&self, tag: &str) -> usize;

    fn clear(&self);

    /// Optional maintenance sweep; returns the number of entries removed.
    fn purge_expired(&self) -> usize;
}

/// Filesystem-backed implementation: one JSON file per key under a
/// namespaced directory.
#[derive(Debug)]
pub struct FsLocalStore {
    dir: PathBuf,
}

impl FsLocalStore {
    pub fn new(base_dir: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            dir: base_dir.into().join(namespace),
        }
    }

    /// Keys may contain separators and arbitrary punctuation; the file
    /// name is a sanitized prefix plus a hash suffix to rule out
    /// collisions between keys that sanitize identically.
    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(48)
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hex::encode(&hasher.finalize()[..8]);

        self.dir.join(format!("{sanitized}-{digest}.json"))
    }

    fn read_entry(path: &Path) -> Option<StoredEntry> {
        let text = fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }
}

impl LocalStore for FsLocalStore {
    fn get(&self, key: &str) -> Option<StoredEntry> {
        let path = self.path_for(key);
        let entry = match Self::read_entry(&path) {
            Some(entry) => entry,
            None => {
                // Absent or undecodable; drop any unreadable blob
                if path.exists() {
                    tracing::debug!(key, "dropping undecodable local cache entry");
                    let _ = fs::remove_file(&path);
                }
                return None;
            }
        };

        if entry.is_expired() {
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(entry)
    }

    fn set(&self, key: &str, entry: &StoredEntry) {
        let path = self.path_for(key);
        let text = match serde_json::to_string(entry) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(key, error = %e, "skipping unserializable local cache write");
                return;
            }
        };

        if let Err(e) = write_atomic_string(&path, &text) {
            tracing::warn!(key, error = %e, "local cache write skipped");
        }
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    fn invalidate_by_tag(&self, tag: &str) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for file in entries.filter_map(|e| e.ok()) {
            let path = file.path();
            let tagged = Self::read_entry(&path).is_some_and(|entry| entry.has_tag(tag));
            if tagged && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn clear(&self) {
        let _ = fs::remove_dir_all(&self.dir);
    }

    fn purge_expired(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut purged = 0;
        for file in entries.filter_map(|e| e.ok()) {
            let path = file.path();
            let stale = match Self::read_entry(&path) {
                Some(entry) => entry.is_expired(),
                None => true,
            };
            if stale && fs::remove_file(&path).is_ok() {
                purged += 1;
            }
        }
        purged
    }
}

/// No-op implementation for execution contexts without local storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLocalStore;

impl LocalStore for NoopLocalStore {
    fn get(&self, _key: &str) -> Option<StoredEntry> {
        None
    }

    fn set(&self, _key: &str, _entry: &StoredEntry) {}

    fn remove(&self, _key: &str) {}

    fn invalidate_by_tag(&self, _tag: &str) -> usize {
        0
    }

    fn clear(&self) {}

    fn purge_expired(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_set_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);

        let entry = StoredEntry::new(json!({"nome": "Acme"}), TTL, vec!["empresa:42".into()]);
        store.set("empresa:42", &entry);

        let back = store.get("empresa:42").unwrap();
        assert_eq!(back.data, json!({"nome": "Acme"}));
        assert_eq!(back.tags, vec!["empresa:42".to_string()]);
    }

    #[test]
    fn test_expired_entry_is_deleted_on_read() {
        let dir = TempDir::new().unwrap();
        let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);

        let mut entry = StoredEntry::new(json!(1), Duration::from_millis(10), vec![]);
        entry.timestamp -= 100;
        store.set("stale", &entry);

        assert!(store.get("stale").is_none());
        // The blob itself is gone too
        assert!(!store.path_for("stale").exists());
    }

    #[test]
    fn test_undecodable_blob_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);

        let path = store.path_for("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json at all").unwrap();

        assert!(store.get("broken").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_survives_fresh_instance_over_same_dir() {
        let dir = TempDir::new().unwrap();
        {
            let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);
            store.set("k", &StoredEntry::new(json!("v"), TTL, vec![]));
        }
        let reopened = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);
        assert_eq!(reopened.get("k").unwrap().data, json!("v"));
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);

        // Same sanitized form, different keys
        store.set("das:42:2024-01", &StoredEntry::new(json!(1), TTL, vec![]));
        store.set("das_42_2024_01", &StoredEntry::new(json!(2), TTL, vec![]));

        assert_eq!(store.get("das:42:2024-01").unwrap().data, json!(1));
        assert_eq!(store.get("das_42_2024_01").unwrap().data, json!(2));
    }

    #[test]
    fn test_invalidate_by_tag_scans_entries() {
        let dir = TempDir::new().unwrap();
        let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);

        store.set(
            "das:42:2024-01",
            &StoredEntry::new(json!(1), TTL, vec!["das".into(), "empresa:42".into()]),
        );
        store.set(
            "das:7:2024-01",
            &StoredEntry::new(json!(2), TTL, vec!["das".into(), "empresa:7".into()]),
        );

        assert_eq!(store.invalidate_by_tag("empresa:42"), 1);
        assert!(store.get("das:42:2024-01").is_none());
        assert!(store.get("das:7:2024-01").is_some());
    }

    #[test]
    fn test_purge_expired_sweeps_only_stale() {
        let dir = TempDir::new().unwrap();
        let store = FsLocalStore::new(dir.path(), DEFAULT_NAMESPACE);

        store.set("fresh", &StoredEntry::new(json!(1), TTL, vec![]));
        let mut stale = StoredEntry::new(json!(2), Duration::from_millis(10), vec![]);
        stale.timestamp -= 100;
        store.set("stale", &stale);

        assert_eq!(store.purge_expired(), 1);
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn test_noop_store_is_silent() {
        let store = NoopLocalStore;
        store.set("k", &StoredEntry::new(json!(1), TTL, vec![]));
        assert!(store.get("k").is_none());
        assert_eq!(store.purge_expired(), 0);
    }
}
