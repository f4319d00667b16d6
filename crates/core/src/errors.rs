//! Error types shared across the contaflux workspace.

use std::time::Duration;

/// Result type alias for contaflux operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for contaflux operations.
///
/// Variants carry rendered `String` payloads rather than boxed sources:
/// a settled failure is fanned out to every caller waiting on the same
/// deduplicated request, so the error must be `Clone`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Serialization/deserialization errors
    #[error("serialization error for '{key}': {message}")]
    Serialization { key: String, message: String },

    /// Local storage operation failures
    #[error("storage {operation} failed for '{path}': {message}")]
    Storage {
        path: String,
        operation: &'static str,
        message: String,
    },

    /// Network-related errors (remote tier, asset fetches)
    #[error("network {operation} failed for '{endpoint}': {message}")]
    Network {
        endpoint: String,
        operation: &'static str,
        message: String,
    },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Per-endpoint rate limit reached
    #[error("rate limit reached for '{namespace}', retry after {retry_after:?}")]
    RateLimited {
        namespace: String,
        retry_after: Duration,
    },

    /// The wrapped upstream operation failed after all retries
    #[error("request '{key}' failed: {message}")]
    Upstream { key: String, message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    pub fn serialization(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Serialization {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(
        path: impl Into<String>,
        operation: &'static str,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::Storage {
            path: path.into(),
            operation,
            message: message.to_string(),
        }
    }

    pub fn network(
        endpoint: impl Into<String>,
        operation: &'static str,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            operation,
            message: message.to_string(),
        }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn upstream(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Upstream {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Timeouts are deliberately indistinguishable from network errors
    /// here: both are transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::Timeout { .. } | Error::Upstream { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization {
            key: String::new(),
            message: error.to_string(),
        }
    }
}
