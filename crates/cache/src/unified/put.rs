//! Write path: independent fan-out to every enabled tier.

use super::types::{CacheWriteOptions, TierConfig, UnifiedCache};
use crate::entry::StoredEntry;
use contaflux_core::{Error, Result};
use serde::Serialize;

impl UnifiedCache {
    /// Write the value to every enabled tier. Tier writes are
    /// independent: a failure in one (quota, network) never prevents
    /// the others, and no ordering between them is guaranteed: cache
    /// entries are always re-derivable from the source of truth.
    pub async fn set<T>(
        &self,
        key: &str,
        value: &T,
        options: CacheWriteOptions,
        tiers: TierConfig,
    ) -> Result<()>
    where
        T: Serialize,
    {
        let data = serde_json::to_value(value).map_err(|e| Error::serialization(key, e))?;
        let ttl = options.ttl.unwrap_or(self.inner.default_ttl);
        let stored = StoredEntry::new(data, ttl, options.tags);

        if tiers.memory {
            self.inner
                .memory
                .insert_stored(key, stored.clone(), options.priority);
        }

        if tiers.local {
            // Errors are swallowed inside the adapter (write-is-optional)
            self.inner.local.set(key, &stored);
        }

        if tiers.remote {
            if let Some(remote) = &self.inner.remote {
                remote.set(key, &stored).await;
            }
        }

        Ok(())
    }
}
