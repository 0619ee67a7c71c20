// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key-value store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use guildsync_core::traits::adapter::Adapter;
use guildsync_core::traits::store::KeyValueStore;
use guildsync_core::types::{AdapterType, HealthStatus};
use guildsync_core::GuildsyncError;

/// A `KeyValueStore` backed by a `HashMap`, with a switch to make writes
/// fail for exercising persistence-degradation paths.
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make `set` and `remove` fail until switched back off. Reads keep
    /// working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MemoryStore {
    fn name(&self) -> &str {
        "memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, GuildsyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GuildsyncError> {
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GuildsyncError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), GuildsyncError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GuildsyncError::Storage {
                source: Box::new(std::io::Error::other("scripted write failure")),
            });
        }
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), GuildsyncError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GuildsyncError::Storage {
                source: Box::new(std::io::Error::other("scripted write failure")),
            });
        }
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_round_trip() {
        let store = MemoryStore::new();
        store.set("k", b"v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(&b"v1"[..]));
        store.set("k", b"v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(&b"v2"[..]));
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_failure_switch() {
        let store = MemoryStore::new();
        store.set("k", b"v").await.unwrap();
        store.fail_writes(true);
        assert!(store.set("k", b"x").await.is_err());
        // The previous value is untouched and still readable.
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(&b"v"[..]));
        store.fail_writes(false);
        store.set("k", b"x").await.unwrap();
    }
}
