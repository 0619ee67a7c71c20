// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./guildsync.toml` > `~/.config/guildsync/guildsync.toml`
//! > `/etc/guildsync/guildsync.toml` with environment variable overrides via
//! the `GUILDSYNC_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GuildsyncConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/guildsync/guildsync.toml` (system-wide)
/// 3. `~/.config/guildsync/guildsync.toml` (user XDG config)
/// 4. `./guildsync.toml` (local directory)
/// 5. `GUILDSYNC_*` environment variables
pub fn load_config() -> Result<GuildsyncConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GuildsyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuildsyncConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GuildsyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GuildsyncConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(GuildsyncConfig::default()))
        .merge(Toml::file("/etc/guildsync/guildsync.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("guildsync/guildsync.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("guildsync.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: only the leading section segment
/// becomes a dot, so `GUILDSYNC_QUEUE_MAX_RETRIES` maps to
/// `queue.max_retries` and `GUILDSYNC_QUEUE_STORAGE_KEY` to
/// `queue.storage_key`. Figment hands the mapper the key in its original
/// upper case; fold it before matching.
fn env_provider() -> Env {
    Env::prefixed("GUILDSYNC_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        let mapped = ["queue", "sync", "storage"].iter().find_map(|section| {
            key.strip_prefix(&format!("{section}_"))
                .map(|rest| format!("{section}.{rest}"))
        });
        mapped.unwrap_or(key).into()
    })
}
