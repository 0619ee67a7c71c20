// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as a non-empty, monotonic backoff schedule and non-zero
//! timer intervals.

use crate::diagnostic::ConfigError;
use crate::model::GuildsyncConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GuildsyncConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.queue.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_retries must be at least 1".to_string(),
        });
    }

    if config.queue.backoff_ms.is_empty() {
        errors.push(ConfigError::Validation {
            message: "queue.backoff_ms must contain at least one delay".to_string(),
        });
    }

    // The backoff delay between attempt k and k+1 must be non-decreasing.
    if config.queue.backoff_ms.windows(2).any(|w| w[1] < w[0]) {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.backoff_ms must be non-decreasing, got {:?}",
                config.queue.backoff_ms
            ),
        });
    }

    if config.queue.tick_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.tick_interval_secs must be at least 1".to_string(),
        });
    }

    if config.queue.retention_days == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.retention_days must be at least 1".to_string(),
        });
    }

    if config.queue.storage_key.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "queue.storage_key must not be empty".to_string(),
        });
    }

    if config.queue.max_text_len == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_text_len must be at least 1".to_string(),
        });
    }

    if config.sync.initial_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.initial_limit must be at least 1".to_string(),
        });
    }

    if config.sync.page_size == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.page_size must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GuildsyncConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_backoff_table_fails() {
        let mut config = GuildsyncConfig::default();
        config.queue.backoff_ms = vec![];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("backoff_ms"))));
    }

    #[test]
    fn decreasing_backoff_fails() {
        let mut config = GuildsyncConfig::default();
        config.queue.backoff_ms = vec![4000, 2000, 1000];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("non-decreasing"))));
    }

    #[test]
    fn plateau_in_backoff_is_allowed() {
        let mut config = GuildsyncConfig::default();
        config.queue.backoff_ms = vec![1000, 2000, 2000, 2000];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_retries_and_zero_page_size_fail() {
        let mut config = GuildsyncConfig::default();
        config.queue.max_retries = 0;
        config.sync.page_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn empty_database_path_fails() {
        let mut config = GuildsyncConfig::default();
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }
}
