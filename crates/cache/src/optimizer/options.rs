//! Per-request tuning knobs for the optimizer pipeline.

use crate::unified::TierConfig;
use std::time::Duration;

/// Default lifetime for cached request results (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default number of attempts
pub const DEFAULT_RETRIES: u32 = 3;

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for a single [`optimized_request`] call.
///
/// [`optimized_request`]: crate::optimizer::RequestOptimizer::optimized_request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Consult the cache before executing and write the result after
    pub cache: bool,
    /// Lifetime for the cached result
    pub cache_ttl: Duration,
    /// Tags attached to the cached result
    pub tags: Vec<String>,
    /// Tiers used for both the pre-check and the write-through
    pub tiers: TierConfig,
    /// Debounce window; zero disables the stage
    pub debounce: Duration,
    /// Total attempts for the wrapped operation
    pub retries: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cache: true,
            cache_ttl: DEFAULT_CACHE_TTL,
            tags: Vec::new(),
            tiers: TierConfig::default(),
            debounce: DEFAULT_DEBOUNCE,
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RequestOptions {
    /// No caching, no debounce: a plain deduplicated retry wrapper.
    pub fn passthrough() -> Self {
        Self {
            cache: false,
            debounce: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn without_debounce(mut self) -> Self {
        self.debounce = Duration::ZERO;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tiers(mut self, tiers: TierConfig) -> Self {
        self.tiers = tiers;
        self
    }
}
