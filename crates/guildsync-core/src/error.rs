// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Guildsync delivery engine.

use thiserror::Error;

use crate::delivery::DeliveryState;

/// The primary error type used across all Guildsync adapter traits and core operations.
#[derive(Debug, Error)]
pub enum GuildsyncError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller-side validation failures (empty sanitized text, oversized payload).
    /// Never queued and never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transient transport failures (network unreachable, timeout, throttling).
    /// Retried per the backoff policy.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote store rejected the payload. Permanent: short-circuits to
    /// `failed` without consuming the retry budget.
    #[error("remote rejected message: {message}")]
    Rejected { message: String },

    /// Local storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A delivery status transition that the state machine does not admit.
    #[error("invalid delivery transition: {from} -> {to}")]
    InvalidTransition {
        from: DeliveryState,
        to: DeliveryState,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GuildsyncError {
    /// Whether the retry policy may re-attempt the failed operation.
    ///
    /// Classification is by variant, never by message string matching:
    /// transport breaks and timeouts are transient; remote rejections and
    /// validation failures are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GuildsyncError::Transport { .. } | GuildsyncError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_timeout_are_retryable() {
        let transport = GuildsyncError::Transport {
            message: "connection reset".into(),
            source: None,
        };
        let timeout = GuildsyncError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        assert!(transport.is_retryable());
        assert!(timeout.is_retryable());
    }

    #[test]
    fn rejection_and_validation_are_permanent() {
        let rejected = GuildsyncError::Rejected {
            message: "malformed payload".into(),
        };
        let validation = GuildsyncError::Validation("empty text".into());
        assert!(!rejected.is_retryable());
        assert!(!validation.is_retryable());
    }

    #[test]
    fn storage_errors_are_not_retried_by_the_send_policy() {
        let storage = GuildsyncError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(!storage.is_retryable());
    }
}
