//! Shared utilities and resilience primitives for contaflux
//!
//! This crate provides the cross-cutting machinery the cache subsystem
//! leans on: retry with exponential backoff and per-attempt timeouts,
//! fixed-window rate limiting, atomic file writes, and tracing setup.

pub mod atomic_file;
pub mod limiter;
pub mod resilience;
pub mod tracing;

pub use atomic_file::*;
pub use limiter::*;
pub use resilience::*;
