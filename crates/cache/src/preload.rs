//! Opportunistic resource preloading.
//!
//! Lowest-priority component: it warms assets and routes ahead of
//! demand but must never affect correctness, only latency. Every
//! failure is logged and swallowed. Loading is delegated to an
//! [`AssetLoader`] so the preloader itself stays transport-agnostic;
//! navigation intent (the user hovering a link, in the original UI)
//! arrives as hints on an mpsc channel.

use crate::entry::Priority;
use async_trait::async_trait;
use contaflux_core::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fetches one asset or route into whatever cache sits behind it.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, asset: &str, priority: Priority) -> Result<()>;
}

/// Asset lists and pacing for a preloader instance.
#[derive(Debug, Clone)]
pub struct PreloadConfig {
    /// Loaded immediately by [`ResourcePreloader::preload_critical_assets`]
    pub critical_assets: Vec<String>,
    /// Loaded after `secondary_delay`, once the critical set settled
    pub secondary_assets: Vec<String>,
    /// Loaded during idle time by [`ResourcePreloader::intelligent_preload`]
    pub idle_assets: Vec<String>,
    /// Pause between the critical and secondary phases
    pub secondary_delay: Duration,
    /// Fallback idle period before the idle set is warmed
    pub idle_delay: Duration,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            critical_assets: Vec::new(),
            secondary_assets: Vec::new(),
            idle_assets: Vec::new(),
            secondary_delay: Duration::from_secs(2),
            idle_delay: Duration::from_secs(3),
        }
    }
}

/// Best-effort cache warmer. Cheap to clone; clones share the
/// loaded-asset registry and the shutdown flag.
#[derive(Clone)]
pub struct ResourcePreloader {
    inner: Arc<PreloaderInner>,
}

struct PreloaderInner {
    loader: Arc<dyn AssetLoader>,
    config: PreloadConfig,
    loaded: DashMap<String, ()>,
    shutdown: AtomicBool,
}

impl ResourcePreloader {
    pub fn new(loader: Arc<dyn AssetLoader>, config: PreloadConfig) -> Self {
        Self {
            inner: Arc::new(PreloaderInner {
                loader,
                config,
                loaded: DashMap::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Load one asset, remembering success. Repeated calls for an
    /// already-loaded asset return immediately without re-fetching.
    /// A failed load is not remembered, so a later call retries it.
    pub async fn preload_asset(&self, asset: &str, priority: Priority) {
        if self.inner.shutdown.load(Ordering::Relaxed) {
            return;
        }
        if self.inner.loaded.contains_key(asset) {
            tracing::trace!(asset, "already preloaded");
            return;
        }

        match self.inner.loader.load(asset, priority).await {
            Ok(()) => {
                self.inner.loaded.insert(asset.to_string(), ());
                tracing::trace!(asset, ?priority, "preloaded");
            }
            Err(e) => {
                tracing::debug!(asset, error = %e, "preload failed");
            }
        }
    }

    /// Warm the critical set in parallel, then after a short pause the
    /// secondary set. Individual failures never stop the rest.
    pub async fn preload_critical_assets(&self) {
        let critical = self
            .inner
            .config
            .critical_assets
            .iter()
            .map(|asset| self.preload_asset(asset, Priority::High));
        futures::future::join_all(critical).await;

        tokio::time::sleep(self.inner.config.secondary_delay).await;
        if self.inner.shutdown.load(Ordering::Relaxed) {
            return;
        }

        let secondary = self
            .inner
            .config
            .secondary_assets
            .iter()
            .map(|asset| self.preload_asset(asset, Priority::Normal));
        futures::future::join_all(secondary).await;
    }

    /// Background warming driven by navigation hints.
    ///
    /// Each hint (a route the user is likely to visit next) is
    /// prefetched at low priority as it arrives. Independently, once
    /// the idle period lapses the configured idle set is warmed. The
    /// task ends when the hint channel closes or after [`shutdown`].
    ///
    /// [`shutdown`]: ResourcePreloader::shutdown
    pub fn intelligent_preload(&self, mut hints: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let preloader = self.clone();
        tokio::spawn(async move {
            let idle = tokio::time::sleep(preloader.inner.config.idle_delay);
            tokio::pin!(idle);
            let mut idle_done = false;

            loop {
                if preloader.inner.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                tokio::select! {
                    hint = hints.recv() => match hint {
                        Some(route) => preloader.preload_asset(&route, Priority::Low).await,
                        None => break,
                    },
                    _ = &mut idle, if !idle_done => {
                        idle_done = true;
                        for asset in &preloader.inner.config.idle_assets {
                            preloader.preload_asset(asset, Priority::Low).await;
                        }
                    }
                }
            }
            tracing::debug!("intelligent preload task finished");
        })
    }

    /// Stop all future preloading. In-flight loads finish on their own.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_loaded(&self, asset: &str) -> bool {
        self.inner.loaded.contains_key(asset)
    }

    pub fn loaded_count(&self) -> usize {
        self.inner.loaded.len()
    }
}

impl std::fmt::Debug for ResourcePreloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePreloader")
            .field("loaded", &self.inner.loaded.len())
            .field("shutdown", &self.inner.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}
