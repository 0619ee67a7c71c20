// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote channel trait for the authoritative message store.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::GuildsyncError;
use crate::traits::adapter::Adapter;
use crate::types::{ConversationId, Message, MessageId, OutgoingMessage, SubscriptionEvent};

/// Adapter for the remote document store that owns conversations.
///
/// Accepts message writes, answers paginated history queries, and emits a
/// live feed of message changes per conversation. Errors returned from
/// `send` carry the retryable/permanent distinction via
/// [`GuildsyncError::is_retryable`].
#[async_trait]
pub trait RemoteChannel: Adapter {
    /// Writes a message and returns the server-confirmed id.
    async fn send(&self, msg: &OutgoingMessage) -> Result<MessageId, GuildsyncError>;

    /// Returns up to `limit` messages strictly older than `before_ms`,
    /// ordered by server timestamp descending.
    async fn query_before(
        &self,
        conversation: &ConversationId,
        before_ms: i64,
        limit: usize,
    ) -> Result<Vec<Message>, GuildsyncError>;

    /// Opens a live subscription for one conversation.
    ///
    /// Each [`SubscriptionEvent::Snapshot`] is the full current message list
    /// (scoped to the most recent `limit` when given). After a
    /// [`SubscriptionEvent::TransportError`] the receiver ends; reconnection
    /// is the consumer's responsibility. Dropping the receiver releases the
    /// subscription.
    async fn subscribe(
        &self,
        conversation: &ConversationId,
        limit: Option<usize>,
    ) -> Result<mpsc::Receiver<SubscriptionEvent>, GuildsyncError>;
}
