//! Request optimizer: a pipeline wrapped around expensive async calls.
//!
//! Every [`optimized_request`] passes through the same stages, in order:
//! cache pre-check, per-namespace rate limiting, debouncing,
//! deduplication of identical in-flight requests, bounded retry with
//! per-attempt timeouts, and finally a write-through of the result.
//! Each stage can be relaxed per call via [`RequestOptions`].
//!
//! Internally the pipeline is monomorphization-free: requests are
//! settled as [`serde_json::Value`] so that concurrent callers with the
//! same key can share one settlement regardless of their result types.
//!
//! [`optimized_request`]: RequestOptimizer::optimized_request

mod batch;
mod debounce;
mod options;


pub use batch::{BatchRequest, DEFAULT_BATCH_SIZE};
pub use options::RequestOptions;

use crate::entry::Priority;
use crate::unified::{CacheWriteOptions, UnifiedCache};
use async_trait::async_trait;
use contaflux_core::{Error, Result};
use contaflux_utils::{retry_with_timeout, RateLimiter, RetryConfig};
use dashmap::DashMap;
use debounce::DebounceSlot;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Type-erased fetch: reinvocable because retry needs fresh attempts.
pub(crate) type ValueFetch = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// One settlement shared by every caller awaiting the same key.
type SharedSettlement = Shared<BoxFuture<'static, Result<Value>>>;

/// A source of remote data for [`RequestOptimizer::preload_critical_data`].
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Value>;
}

/// Deduplicating, debouncing, rate-limited front door for upstream
/// calls. Cheap to clone; clones share the in-flight registry.
#[derive(Clone)]
pub struct RequestOptimizer {
    inner: Arc<OptimizerInner>,
}

struct OptimizerInner {
    cache: UnifiedCache,
    limiter: RateLimiter,
    in_flight: DashMap<String, SharedSettlement>,
    debounce: DashMap<String, DebounceSlot>,
}

impl RequestOptimizer {
    /// Optimizer with the default rate limit (60 requests per minute
    /// per namespace).
    pub fn new(cache: UnifiedCache) -> Self {
        Self::with_rate_limit(cache, RateLimiter::default())
    }

    pub fn with_rate_limit(cache: UnifiedCache, limiter: RateLimiter) -> Self {
        Self {
            inner: Arc::new(OptimizerInner {
                cache,
                limiter,
                in_flight: DashMap::new(),
                debounce: DashMap::new(),
            }),
        }
    }

    pub fn cache(&self) -> &UnifiedCache {
        &self.inner.cache
    }

    /// Run `fetch` through the full pipeline.
    ///
    /// The rate-limit namespace is the key prefix before the first `:`
    /// (the whole key when there is none), so `das:42:2024-01` and
    /// `das:7:2024-02` share one budget.
    pub async fn optimized_request<T, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        options: RequestOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let value = self
            .optimized_request_value(key, erase_fetch(key, fetch), options)
            .await?;
        serde_json::from_value(value).map_err(|e| Error::serialization(key, e))
    }

    /// The type-erased pipeline. [`BatchRequest`] and the preloader
    /// feed this directly.
    pub(crate) async fn optimized_request_value(
        &self,
        key: &str,
        fetch: ValueFetch,
        options: RequestOptions,
    ) -> Result<Value> {
        if options.cache {
            if let Some(cached) = self.inner.cache.get::<Value>(key, options.tiers).await? {
                tracing::trace!(key, "optimizer served from cache");
                return Ok(cached);
            }
        }

        let namespace = key.split(':').next().unwrap_or(key);
        self.inner.limiter.acquire(namespace).await;

        if options.debounce.is_zero() {
            self.execute(key, fetch, &options).await
        } else {
            self.debounced(key, fetch, options).await
        }
    }

    /// Dedup + retry + write-through. Runs the settlement in a spawned
    /// task so that a cancelled caller cannot strand other waiters or
    /// leak the in-flight slot.
    async fn execute(&self, key: &str, fetch: ValueFetch, options: &RequestOptions) -> Result<Value> {
        use dashmap::mapref::entry::Entry;

        let (tx, rx) = tokio::sync::oneshot::channel::<Result<Value>>();
        let settlement: SharedSettlement = {
            let key = key.to_string();
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(Error::upstream(key, "request task dropped")))
            }
        }
        .boxed()
        .shared();

        let shared = match self.inner.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                tracing::trace!(key, "joined in-flight request");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                slot.insert(settlement.clone());
                self.spawn_settlement(key.to_string(), fetch, options, tx);
                settlement
            }
        };

        shared.await
    }

    fn spawn_settlement(
        &self,
        key: String,
        fetch: ValueFetch,
        options: &RequestOptions,
        tx: tokio::sync::oneshot::Sender<Result<Value>>,
    ) {
        let retry = RetryConfig {
            attempts: options.retries,
            timeout: options.timeout,
            ..Default::default()
        };
        let write_back = options.cache;
        let cache_ttl = options.cache_ttl;
        let tags = options.tags.clone();
        let tiers = options.tiers;
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let result = retry_with_timeout(&retry, &key, || fetch()).await;
            inner.in_flight.remove(&key);

            if write_back {
                if let Ok(value) = &result {
                    // Null results are not cached: a null today is
                    // usually a transient "not yet" upstream.
                    if !value.is_null() {
                        let write = CacheWriteOptions {
                            ttl: Some(cache_ttl),
                            tags,
                            priority: Priority::Normal,
                        };
                        if let Err(e) = inner.cache.set(&key, value, write, tiers).await {
                            tracing::warn!(key, error = %e, "failed to cache request result");
                        }
                    }
                }
            }

            // Receiver gone means every waiter was dropped; nothing to do.
            let _ = tx.send(result);
        });
    }

    /// Warm the per-user critical keys (`profile:`, `settings:`,
    /// `permissions:`) in parallel. Failures are logged and swallowed;
    /// preloading is opportunistic by contract.
    pub async fn preload_critical_data(&self, user_id: &str, source: Arc<dyn DataSource>) {
        let endpoints: [(&str, Duration); 3] = [
            ("profile", Duration::from_secs(30 * 60)),
            ("settings", Duration::from_secs(3600)),
            ("permissions", Duration::from_secs(3600)),
        ];

        let warmups = endpoints.map(|(endpoint, ttl)| {
            let key = format!("{endpoint}:{user_id}");
            let source = source.clone();
            let options = RequestOptions::default()
                .with_cache_ttl(ttl)
                .without_debounce();
            async move {
                let fetch_key = key.clone();
                let fetch: ValueFetch = Arc::new(move || {
                    let source = source.clone();
                    let key = fetch_key.clone();
                    async move { source.fetch(&key).await }.boxed()
                });
                if let Err(e) = self.optimized_request_value(&key, fetch, options).await {
                    tracing::debug!(key, error = %e, "critical data preload failed");
                }
            }
        });

        futures::future::join_all(warmups).await;
    }

    /// Keys currently settling; used by tests and diagnostics.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }
}

impl std::fmt::Debug for RequestOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptimizer")
            .field("in_flight", &self.inner.in_flight.len())
            .field("debouncing", &self.inner.debounce.len())
            .finish()
    }
}

/// Wrap a typed fetch into the [`ValueFetch`] the pipeline settles on.
pub(crate) fn erase_fetch<T, F, Fut>(key: &str, fetch: F) -> ValueFetch
where
    T: Serialize,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let key = key.to_string();
    Arc::new(move || {
        let key = key.clone();
        let attempt = fetch();
        async move {
            let value = attempt.await?;
            serde_json::to_value(value).map_err(|e| Error::serialization(key, e))
        }
        .boxed()
    })
}
