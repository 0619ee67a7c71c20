// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use guildsync_core::GuildsyncError;

use crate::migrations;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, GuildsyncError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| GuildsyncError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| GuildsyncError::Storage {
                source: Box::new(e),
            })?;
        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub fn map_tr_err<E>(err: tokio_rusqlite::Error<E>) -> GuildsyncError
where
    E: std::error::Error + Send + Sync + 'static,
{
    GuildsyncError::Storage {
        source: Box::new(err),
    }
}
