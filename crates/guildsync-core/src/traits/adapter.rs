// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all external collaborators must implement.

use async_trait::async_trait;

use crate::error::GuildsyncError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for every Guildsync adapter.
///
/// The remote channel, key-value store, and network monitor all implement
/// this trait, which provides identity, lifecycle, and health check
/// capabilities.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter (remote, store, network).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, GuildsyncError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), GuildsyncError>;
}
