//! Unified cache tests


use super::UnifiedCache;
use crate::local::{FsLocalStore, DEFAULT_NAMESPACE};
use crate::memory::MemoryStore;
use std::path::Path;
use std::time::Duration;

pub(super) fn cache_over(dir: &Path) -> UnifiedCache {
    UnifiedCache::from_parts(
        MemoryStore::new(1000),
        Box::new(FsLocalStore::new(dir, DEFAULT_NAMESPACE)),
        None,
        Duration::from_secs(300),
    )
}
