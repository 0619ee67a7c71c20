// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock connectivity monitor for testing.

use async_trait::async_trait;
use tokio::sync::watch;

use guildsync_core::traits::adapter::Adapter;
use guildsync_core::traits::network::NetworkMonitor;
use guildsync_core::types::{AdapterType, HealthStatus};
use guildsync_core::GuildsyncError;

/// A `NetworkMonitor` whose state the test body flips directly.
pub struct MockNetwork {
    tx: watch::Sender<bool>,
}

impl MockNetwork {
    pub fn online() -> Self {
        let (tx, _) = watch::channel(true);
        Self { tx }
    }

    pub fn offline() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Flip connectivity. Watchers observe the transition.
    pub fn set_online(&self, online: bool) {
        // send_replace never fails even with no live receivers.
        self.tx.send_replace(online);
    }
}

#[async_trait]
impl Adapter for MockNetwork {
    fn name(&self) -> &str {
        "mock-network"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Network
    }

    async fn health_check(&self) -> Result<HealthStatus, GuildsyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GuildsyncError> {
        Ok(())
    }
}

#[async_trait]
impl NetworkMonitor for MockNetwork {
    async fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
