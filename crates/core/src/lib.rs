//! Core types and errors for contaflux
//!
//! This crate holds the shared error type and the small time helpers
//! that the caching tiers agree on. Everything here is dependency-light
//! so that every other workspace member can build on it.

pub mod errors;
pub mod time;

pub use errors::{Error, Result};
pub use time::{epoch_ms, ms_until_epoch};
