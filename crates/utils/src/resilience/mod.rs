//! Resilience patterns for operations that cross a network boundary.
//!
//! ## Key Components
//!
//! - **`retry`**: bounded retry with exponential backoff and a
//!   per-attempt timeout, used to wrap every upstream fetch.

pub mod retry;

pub use retry::{retry_with_timeout, RetryConfig};
