// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Guildsync delivery engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and miette diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use guildsync_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("max retries: {}", config.queue.max_retries);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{GuildsyncConfig, QueueConfig, StorageConfig, SyncConfig};

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
pub fn load_and_validate() -> Result<GuildsyncConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<GuildsyncConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_inline_config_loads() {
        let config = load_and_validate_str(
            r#"
[queue]
max_retries = 4

[storage]
database_path = "/tmp/guildsync-test.db"
"#,
        )
        .unwrap();
        assert_eq!(config.queue.max_retries, 4);
        assert_eq!(config.storage.database_path, "/tmp/guildsync-test.db");
    }

    #[test]
    fn invalid_inline_config_surfaces_validation_errors() {
        let errors = load_and_validate_str(
            r#"
[queue]
backoff_ms = []
"#,
        )
        .unwrap_err();
        assert!(!errors.is_empty());
    }
}
