//! Unified multi-tier cache service.
//!
//! Orchestrates the three tiers: read-through with promotion (a hit in
//! a slower tier is copied upward), write-through fan-out (each enabled
//! tier is written independently) and tag-based bulk invalidation.

mod get;
mod invalidate;
mod put;
mod types;

pub use types::{CacheWriteOptions, TierConfig, UnifiedCache};

#[cfg(test)]
mod tests;
