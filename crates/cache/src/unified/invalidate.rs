//! Deletion, tag invalidation, clear and stats.

use super::types::{TierConfig, UnifiedCache};
use crate::entry::CacheStats;

impl UnifiedCache {
    /// Delete the key from every enabled tier.
    pub async fn invalidate(&self, key: &str, tiers: TierConfig) {
        if tiers.memory {
            self.inner.memory.delete(key);
        }
        if tiers.local {
            self.inner.local.remove(key);
        }
        if tiers.remote {
            if let Some(remote) = &self.inner.remote {
                remote.delete(key).await;
            }
        }
    }

    /// Remove every entry carrying `tag` from the enabled tiers and
    /// return the total count removed. The local tier is excluded from
    /// [`TierConfig::tag_default`] because it takes a full file scan,
    /// but an explicit `local: true` is honored.
    pub async fn invalidate_by_tag(&self, tag: &str, tiers: TierConfig) -> usize {
        let mut removed = 0;

        if tiers.memory {
            removed += self.inner.memory.invalidate_by_tag(tag);
        }
        if tiers.local {
            removed += self.inner.local.invalidate_by_tag(tag);
        }
        if tiers.remote {
            if let Some(remote) = &self.inner.remote {
                removed += remote.invalidate_by_tag(tag).await;
            }
        }

        if removed > 0 {
            tracing::debug!(tag, removed, "tag invalidation");
        }
        removed
    }

    /// Drop everything from the enabled tiers.
    pub async fn clear(&self, tiers: TierConfig) {
        if tiers.memory {
            self.inner.memory.clear();
        }
        if tiers.local {
            self.inner.local.clear();
        }
        if tiers.remote {
            if let Some(remote) = &self.inner.remote {
                remote.clear().await;
            }
        }
    }

    /// Memory-tier statistics. The other tiers do not report stats.
    pub fn stats(&self) -> CacheStats {
        self.inner.memory.stats()
    }
}
