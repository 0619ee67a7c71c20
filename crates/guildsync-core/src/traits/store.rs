// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store trait for durable local persistence.

use async_trait::async_trait;

use crate::error::GuildsyncError;
use crate::traits::adapter::Adapter;

/// Adapter for durable local key-value storage.
///
/// The offline queue persists its snapshot here; the data must survive
/// process restart. Only the queue reads or writes its key.
#[async_trait]
pub trait KeyValueStore: Adapter {
    /// Returns the stored bytes for `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GuildsyncError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), GuildsyncError>;

    /// Removes `key` if present.
    async fn remove(&self, key: &str) -> Result<(), GuildsyncError>;
}
