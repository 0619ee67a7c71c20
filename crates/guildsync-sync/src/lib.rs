// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live subscriptions and backward pagination over the remote channel.
//!
//! [`SyncChannel`] keeps a conversation's message list current and shields
//! the consumer from transient stream failures; [`PaginationCursor`] loads
//! older history in stable timestamp-anchored pages.

mod channel;
mod pagination;

pub use channel::{SyncChannel, SyncHandle};
pub use pagination::{HistoryPage, PaginationCursor};
