// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network monitor trait for connectivity transitions.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::GuildsyncError;
use crate::traits::adapter::Adapter;

/// Adapter reporting device connectivity.
///
/// `watch()` hands out a receiver whose value flips on every transition;
/// the queue uses it to process immediately on regaining connectivity and
/// to pause its timer while offline.
#[async_trait]
pub trait NetworkMonitor: Adapter {
    /// Current connectivity state.
    async fn is_connected(&self) -> bool;

    /// Subscribe to connectivity transitions.
    fn watch(&self) -> watch::Receiver<bool>;
}
