//! Unified cache types and construction.

use crate::config::CacheConfig;
use crate::entry::Priority;
use crate::local::{FsLocalStore, LocalStore, NoopLocalStore};
use crate::memory::MemoryStore;
use crate::remote::RemoteStore;
use contaflux_core::Result;
use std::sync::Arc;
use std::time::Duration;

/// Tier selection for a single operation.
///
/// Memory is always consulted first, then local, then remote, in the
/// fixed fastest-first order. Defaults: reads and writes use
/// memory+local; the remote tier is opt-in because it is the only tier
/// with network latency and cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    pub memory: bool,
    pub local: bool,
    pub remote: bool,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            memory: true,
            local: true,
            remote: false,
        }
    }
}

impl TierConfig {
    pub const fn memory_only() -> Self {
        Self {
            memory: true,
            local: false,
            remote: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            memory: true,
            local: true,
            remote: true,
        }
    }

    /// Default for tag invalidation: memory+remote. The local tier's
    /// tags are not indexed, so including it costs a full file scan;
    /// callers opt in with an explicit `local: true`.
    pub const fn tag_default() -> Self {
        Self {
            memory: true,
            local: false,
            remote: true,
        }
    }
}

/// Per-write options: lifetime, tags and priority.
#[derive(Debug, Clone, Default)]
pub struct CacheWriteOptions {
    /// Lifetime; the service default applies when unset
    pub ttl: Option<Duration>,
    /// Labels for group invalidation, immutable after write
    pub tags: Vec<String>,
    /// Informational priority
    pub priority: Priority,
}

impl CacheWriteOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Default::default()
        }
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Unified multi-tier cache service.
///
/// Cheap to clone; all clones share the same tiers. Construct one per
/// process and inject it; there is deliberately no global instance.
#[derive(Clone)]
pub struct UnifiedCache {
    pub(super) inner: Arc<CacheInner>,
}

pub(super) struct CacheInner {
    pub memory: MemoryStore,
    pub local: Box<dyn LocalStore>,
    pub remote: Option<RemoteStore>,
    pub default_ttl: Duration,
}

impl UnifiedCache {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let local: Box<dyn LocalStore> = match &config.local_dir {
            Some(dir) => Box::new(FsLocalStore::new(dir.clone(), &config.local_namespace)),
            None => Box::new(NoopLocalStore),
        };

        let remote = match &config.remote {
            Some(remote_config) => Some(RemoteStore::new(remote_config)?),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(CacheInner {
                memory: MemoryStore::new(config.memory_capacity),
                local,
                remote,
                default_ttl: config.default_ttl,
            }),
        })
    }

    /// Assemble from explicit parts; used by tests and by callers that
    /// need a custom local-store implementation.
    pub fn from_parts(
        memory: MemoryStore,
        local: Box<dyn LocalStore>,
        remote: Option<RemoteStore>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                memory,
                local,
                remote,
                default_ttl,
            }),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }
}

impl std::fmt::Debug for UnifiedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedCache")
            .field("memory_items", &self.inner.memory.len())
            .field("remote_configured", &self.inner.remote.is_some())
            .finish()
    }
}
