//! Per-namespace fixed-window rate limiting.
//!
//! This is an approximate fixed window, not a true sliding window: the
//! first request in a namespace opens a window, and the counter resets
//! once the window has fully elapsed. Callers at the ceiling wait for
//! the remainder of the current window rather than erroring.

use contaflux_core::{Error, Result};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default per-minute ceiling for a namespace
const DEFAULT_LIMIT: u32 = 60;

/// Default window length
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
}

/// Approximate fixed-window rate limiter keyed by endpoint namespace.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit: limit.max(1),
            window,
        }
    }

    /// Take one slot in the namespace's current window, waiting for the
    /// window to lapse if the ceiling has been reached.
    pub async fn acquire(&self, namespace: &str) {
        loop {
            match self.try_acquire(namespace) {
                Ok(()) => return,
                Err(Error::RateLimited { retry_after, .. }) => {
                    tracing::debug!(namespace, ?retry_after, "rate limit reached, waiting");
                    tokio::time::sleep(retry_after).await;
                }
                Err(_) => return,
            }
        }
    }

    /// Non-blocking variant: take a slot or report how long to wait.
    pub fn try_acquire(&self, namespace: &str) -> Result<()> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(namespace.to_string())
            .or_insert_with(|| Window {
                count: 0,
                started: now,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count < self.limit {
            entry.count += 1;
            Ok(())
        } else {
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(entry.started));
            Err(Error::RateLimited {
                namespace: namespace.to_string(),
                retry_after,
            })
        }
    }

    /// Requests counted in the namespace's current window.
    pub fn current_count(&self, namespace: &str) -> u32 {
        self.windows.get(namespace).map(|w| w.count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_under_limit_is_immediate() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.try_acquire("empresas").is_ok());
        }
        assert_eq!(limiter.current_count("empresas"), 5);
    }

    #[tokio::test]
    async fn test_ceiling_reports_retry_after() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.try_acquire("das").unwrap();
        limiter.try_acquire("das").unwrap();

        match limiter.try_acquire("das") {
            Err(Error::RateLimited { retry_after, .. }) => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.try_acquire("das").unwrap();
        assert!(limiter.try_acquire("das").is_err());
        assert!(limiter.try_acquire("empresa").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.acquire("ai").await;

        let start = tokio::time::Instant::now();
        limiter.acquire("ai").await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(limiter.current_count("ai"), 1);
    }
}
