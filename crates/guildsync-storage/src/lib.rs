// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Guildsync delivery engine.
//!
//! Provides [`SqliteStore`], the durable `KeyValueStore` behind the offline
//! queue snapshot. All writes go through one tokio-rusqlite connection;
//! schema changes are embedded refinery migrations applied on open.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
