// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the KeyValueStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use guildsync_config::StorageConfig;
use guildsync_core::traits::adapter::Adapter;
use guildsync_core::traits::store::KeyValueStore;
use guildsync_core::types::{AdapterType, HealthStatus};
use guildsync_core::GuildsyncError;

use crate::database::Database;
use crate::queries;

/// SQLite-backed key-value store.
///
/// Wraps a [`Database`] handle and delegates query operations to the typed
/// query module. The database is lazily opened on the first call to
/// [`initialize`].
///
/// [`initialize`]: SqliteStore::initialize
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: SqliteStore::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database, apply PRAGMAs, and run migrations.
    pub async fn initialize(&self) -> Result<(), GuildsyncError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| GuildsyncError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, GuildsyncError> {
        self.db.get().ok_or_else(|| GuildsyncError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl Adapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, GuildsyncError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err::<rusqlite::Error>)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GuildsyncError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err::<rusqlite::Error>)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, GuildsyncError> {
        queries::kv::get(self.db()?, key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), GuildsyncError> {
        queries::kv::set(self.db()?, key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), GuildsyncError> {
        queries::kv::remove(self.db()?, key).await
    }
}
