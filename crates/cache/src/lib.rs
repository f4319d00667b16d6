//! Multi-tier caching system for contaflux
//!
//! This crate provides the caching core of the platform:
//! - A capacity-bounded in-memory tier with per-entry TTL and tags
//! - A durable local tier (JSON files, best-effort)
//! - A remote durable tier shared across devices (REST table)
//! - A unified service with read-through promotion, write-through
//!   fan-out and tag-based bulk invalidation
//! - A request optimizer (dedup, debounce, rate limiting, retry)
//! - An opportunistic resource preloader

pub mod compat;
pub mod config;
pub mod entry;
pub mod keys;
pub mod local;
pub mod memory;
pub mod optimizer;
pub mod preload;
pub mod remote;
pub mod unified;

pub use compat::{LegacyCache, PerformanceCache};
pub use config::{CacheConfig, CacheConfigBuilder, ConfigSource, RemoteConfig};
pub use entry::{CacheStats, Priority, StoredEntry};
pub use keys::{AiCache, FiscalCache, OcrCache};
pub use local::{FsLocalStore, LocalStore, NoopLocalStore};
pub use memory::MemoryStore;
pub use optimizer::{BatchRequest, DataSource, RequestOptimizer, RequestOptions};
pub use preload::{AssetLoader, PreloadConfig, ResourcePreloader};
pub use remote::RemoteStore;
pub use unified::{CacheWriteOptions, TierConfig, UnifiedCache};
