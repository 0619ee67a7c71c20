// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value operations backing the queue snapshot.

use rusqlite::{params, OptionalExtension};

use guildsync_core::GuildsyncError;

use crate::database::Database;

pub async fn get(db: &Database, key: &str) -> Result<Option<Vec<u8>>, GuildsyncError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

pub async fn set(db: &Database, key: &str, value: &[u8]) -> Result<(), GuildsyncError> {
    let key = key.to_string();
    let value = value.to_vec();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}

pub async fn remove(db: &Database, key: &str) -> Result<(), GuildsyncError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err::<rusqlite::Error>)
}
