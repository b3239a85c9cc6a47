//! Error types for compact block reconciliation.

use std::time::Duration;
use thiserror::Error;

/// Compact block reconciliation errors.
///
/// Every variant is returned to the immediate caller. Nothing in this crate
/// retries on its own; partially resolved blocks stay registered so a later
/// caller can pick up where this one left off.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// A compact key did not decode to a 32-byte content key.
    #[error("Incorrect compact block format: key {index} has length {len}, expected 32")]
    MalformedKey { index: usize, len: usize },

    /// The synchronous path found keys that are not in the local store.
    #[error("Missing transactions: {count}")]
    MissingTransactions { count: usize },

    /// The caller's cancellation fired before the block was complete.
    #[error("Wait for block cancelled")]
    Cancelled,

    /// The wait deadline elapsed before the block was complete.
    #[error("Wait for block timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for reconciliation operations.
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_transactions_message() {
        let err = ReconciliationError::MissingTransactions { count: 2 };
        assert_eq!(err.to_string(), "Missing transactions: 2");
    }

    #[test]
    fn test_malformed_key_message() {
        let err = ReconciliationError::MalformedKey { index: 3, len: 31 };
        assert!(err.to_string().contains("key 3 has length 31"));
    }
}
