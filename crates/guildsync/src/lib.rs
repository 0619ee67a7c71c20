// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guildsync: message delivery and synchronization for a mobile chat client.
//!
//! This facade re-exports the public API of the subsystem crates:
//!
//! - [`OfflineQueue`] — persistent offline send queue with capped
//!   exponential backoff and manual retry
//! - [`SyncChannel`] — live conversation subscriptions that never blank
//!   out on a transient stream error
//! - [`PaginationCursor`] — timestamp-anchored backward history pagination
//! - [`SqliteStore`] — the durable local store behind the queue snapshot
//! - [`GuildsyncConfig`] — layered TOML + environment configuration
//!
//! The engine consumes three adapter seams ([`RemoteChannel`],
//! [`KeyValueStore`], [`NetworkMonitor`]); the application shell provides
//! the implementations.

pub use guildsync_config::{
    load_and_validate, load_and_validate_str, GuildsyncConfig, QueueConfig, StorageConfig,
    SyncConfig,
};
pub use guildsync_core::{
    Adapter, AdapterType, ConversationId, DeliveryState, GuildsyncError, HealthStatus,
    KeyValueStore, Message, MessageContent, MessageId, MessageKind, NetworkMonitor,
    OutgoingMessage, QueueEntryStatus, QueueStatus, QueuedMessage, RemoteChannel,
    SubscriptionEvent,
};
pub use guildsync_queue::OfflineQueue;
pub use guildsync_storage::SqliteStore;
pub use guildsync_sync::{HistoryPage, PaginationCursor, SyncChannel, SyncHandle};
