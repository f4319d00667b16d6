//! Read path: fastest-first lookup with upward promotion.

use super::types::{TierConfig, UnifiedCache};
use crate::entry::{Priority, StoredEntry};
use contaflux_core::Result;
use serde::de::DeserializeOwned;

impl UnifiedCache {
    /// Look the key up in each enabled tier, fastest first, stopping at
    /// the first hit. A hit in a slower tier is promoted into every
    /// faster enabled tier so subsequent reads are cheap.
    pub async fn get<T>(&self, key: &str, tiers: TierConfig) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        if tiers.memory {
            if let Some(value) = self.inner.memory.get(key) {
                match serde_json::from_value::<T>(value) {
                    Ok(decoded) => return Ok(Some(decoded)),
                    Err(e) => {
                        // Corrupted for this type: drop it and fall through
                        tracing::debug!(key, error = %e, "memory entry undecodable, removing");
                        self.inner.memory.delete(key);
                    }
                }
            }
        }

        if tiers.local {
            if let Some(entry) = self.inner.local.get(key) {
                if let Some(decoded) = self.decode_and_promote::<T>(key, entry, tiers, false) {
                    return Ok(Some(decoded));
                }
            }
        }

        if tiers.remote {
            if let Some(remote) = &self.inner.remote {
                if let Some(entry) = remote.get(key).await {
                    if let Some(decoded) = self.decode_and_promote::<T>(key, entry, tiers, true) {
                        return Ok(Some(decoded));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Decode a lower-tier hit and copy it upward. `promote_local`
    /// distinguishes a remote hit (which also refreshes the local tier)
    /// from a local hit (which only needs to reach memory).
    fn decode_and_promote<T>(
        &self,
        key: &str,
        entry: StoredEntry,
        tiers: TierConfig,
        promote_local: bool,
    ) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let decoded = match serde_json::from_value::<T>(entry.data.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(key, error = %e, "lower-tier entry undecodable, treating as miss");
                return None;
            }
        };

        if tiers.memory {
            self.inner
                .memory
                .insert_stored(key, entry.clone(), Priority::Normal);
        }
        if promote_local && tiers.local {
            self.inner.local.set(key, &entry);
        }

        Some(decoded)
    }
}
