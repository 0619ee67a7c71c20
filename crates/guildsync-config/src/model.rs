// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Guildsync delivery engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Guildsync configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuildsyncConfig {
    /// Offline queue and retry policy settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Live subscription and pagination settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Local storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Offline queue and retry policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum automatic delivery attempts per message.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff delays between attempts, in milliseconds. The last entry caps
    /// the schedule for attempts beyond the table length.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,

    /// Interval of the periodic processing timer while the queue is non-empty.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Retention window for failed messages before cleanup purges them.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Key under which the queue snapshot is persisted.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Maximum accepted message text length, in characters.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            tick_interval_secs: default_tick_interval_secs(),
            retention_days: default_retention_days(),
            storage_key: default_storage_key(),
            max_text_len: default_max_text_len(),
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_ms() -> Vec<u64> {
    vec![1000, 2000, 4000, 8000, 16000]
}

fn default_tick_interval_secs() -> u64 {
    30
}

fn default_retention_days() -> u32 {
    7
}

fn default_storage_key() -> String {
    "guildsync.queue.v1".to_string()
}

fn default_max_text_len() -> usize {
    4096
}

/// Live subscription and pagination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Default scope for a new subscription: the most recent N messages.
    #[serde(default = "default_initial_limit")]
    pub initial_limit: usize,

    /// Delay between internal resubscribe attempts after a transport error.
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,

    /// Default page size for backward history pagination.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            initial_limit: default_initial_limit(),
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_initial_limit() -> usize {
    100
}

fn default_resubscribe_delay_ms() -> u64 {
    1000
}

fn default_page_size() -> usize {
    20
}

/// Local storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("guildsync/guildsync.db").display().to_string())
        .unwrap_or_else(|| "guildsync.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}
