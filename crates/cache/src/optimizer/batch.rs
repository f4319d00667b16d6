//! Wave-based batch execution.
//!
//! Requests run in concurrent waves of `batch_size` with a short pause
//! between waves, keeping a burst of independent fetches from landing
//! on the upstream all at once. A failed request yields `None` at its
//! position and never disturbs the rest of the batch.

use super::{erase_fetch, RequestOptimizer, RequestOptions, ValueFetch};
use contaflux_core::Result;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Default requests per wave
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Pause between waves
const WAVE_PAUSE: Duration = Duration::from_millis(100);

/// One request in a batch: a key, its fetch, and per-request options.
pub struct BatchRequest {
    pub key: String,
    pub options: RequestOptions,
    fetch: ValueFetch,
}

impl BatchRequest {
    pub fn new<T, F, Fut>(key: impl Into<String>, fetch: F) -> Self
    where
        T: Serialize,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = key.into();
        let fetch = erase_fetch(&key, fetch);
        Self {
            key,
            options: RequestOptions::default().without_debounce(),
            fetch,
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

impl std::fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRequest")
            .field("key", &self.key)
            .finish()
    }
}

impl RequestOptimizer {
    /// Run `requests` in waves of `batch_size`, preserving order in the
    /// returned vector. Failures become `None`.
    pub async fn batch_requests(
        &self,
        requests: Vec<BatchRequest>,
        batch_size: usize,
    ) -> Vec<Option<Value>> {
        let batch_size = batch_size.max(1);
        let total = requests.len();
        let mut results = Vec::with_capacity(total);
        let mut remaining = requests.into_iter().peekable();

        while remaining.peek().is_some() {
            let wave: Vec<BatchRequest> = remaining.by_ref().take(batch_size).collect();
            let settlements = wave.into_iter().map(|request| async move {
                match self
                    .optimized_request_value(&request.key, request.fetch, request.options)
                    .await
                {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(key = request.key, error = %e, "batched request failed");
                        None
                    }
                }
            });
            results.extend(futures::future::join_all(settlements).await);

            if remaining.peek().is_some() {
                tokio::time::sleep(WAVE_PAUSE).await;
            }
        }

        debug_assert_eq!(results.len(), total);
        results
    }
}
