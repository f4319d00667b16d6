//! Trailing-edge debounce for the optimizer pipeline.
//!
//! Calls for the same key inside the window collapse into one
//! execution of the most recent fetch, and every collapsed caller
//! receives that execution's settlement. Each new call restarts the
//! window (last call wins).

use super::{RequestOptimizer, RequestOptions, ValueFetch};
use contaflux_core::{Error, Result};
use serde_json::Value;
use tokio::sync::broadcast;

/// Burst settlements rarely fan out wider than this; late subscribers
/// past the buffer see a lag error and report abandonment.
const SETTLEMENT_BUFFER: usize = 32;

pub(super) struct DebounceSlot {
    /// Bumped on every call; only the caller whose generation is still
    /// current when its window lapses executes.
    generation: u64,
    pending: Option<ValueFetch>,
    settled: broadcast::Sender<Result<Value>>,
}

impl RequestOptimizer {
    pub(super) async fn debounced(
        &self,
        key: &str,
        fetch: ValueFetch,
        options: RequestOptions,
    ) -> Result<Value> {
        let (my_generation, mut settled) = {
            let mut slot = self
                .inner
                .debounce
                .entry(key.to_string())
                .or_insert_with(|| {
                    let (settled, _) = broadcast::channel(SETTLEMENT_BUFFER);
                    DebounceSlot {
                        generation: 0,
                        pending: None,
                        settled,
                    }
                });
            slot.generation += 1;
            slot.pending = Some(fetch);
            (slot.generation, slot.settled.subscribe())
        };

        tokio::time::sleep(options.debounce).await;

        // Remove the slot before executing: a call arriving after the
        // window lapses is a new request, not part of this burst. It
        // will still coalesce with us through the in-flight registry.
        let winner = self
            .inner
            .debounce
            .remove_if(key, |_, slot| slot.generation == my_generation);

        match winner {
            Some((_, mut slot)) => {
                let fetch = match slot.pending.take() {
                    Some(fetch) => fetch,
                    None => return Err(Error::upstream(key, "debounce slot had no pending call")),
                };
                let result = self.execute(key, fetch, &options).await;
                // No receivers just means the burst was only us.
                let _ = slot.settled.send(result.clone());
                result
            }
            None => {
                // Superseded by a later call; wait for its settlement.
                match settled.recv().await {
                    Ok(result) => result,
                    Err(_) => Err(Error::upstream(key, "debounced request was abandoned")),
                }
            }
        }
    }
}
