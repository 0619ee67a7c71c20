// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock remote channel for deterministic testing.
//!
//! `MockRemote` implements `RemoteChannel` with scriptable send failures,
//! seedable per-conversation history for pagination queries, and
//! hand-driven subscription feeds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use guildsync_core::traits::adapter::Adapter;
use guildsync_core::traits::remote::RemoteChannel;
use guildsync_core::types::{
    AdapterType, ConversationId, HealthStatus, Message, MessageId, OutgoingMessage,
    SubscriptionEvent,
};
use guildsync_core::{DeliveryState, GuildsyncError};

#[derive(Default)]
struct FailureScript {
    /// Remaining sends to fail with a retryable transport error.
    fail_remaining: u32,
    /// Fail every send with a permanent rejection.
    permanent: bool,
    /// Artificial latency applied to every send.
    send_delay: Option<Duration>,
}

struct RemoteState {
    script: FailureScript,
    /// Captured successful sends with the ids the mock assigned them.
    sent: Vec<(OutgoingMessage, MessageId)>,
    /// Count of send attempts, including failed ones.
    attempts: usize,
    /// Per-conversation confirmed history, ascending by `created_at`.
    history: HashMap<ConversationId, Vec<Message>>,
    /// Live subscription feeds per conversation.
    subscribers: HashMap<ConversationId, Vec<mpsc::Sender<SubscriptionEvent>>>,
}

/// A mock remote message store for testing.
///
/// Successful sends are confirmed into the conversation's history with a
/// generated server id and timestamp. Subscription snapshots and transport
/// errors are pushed from the test body via [`push_snapshot`] and
/// [`push_error`].
///
/// [`push_snapshot`]: MockRemote::push_snapshot
/// [`push_error`]: MockRemote::push_error
pub struct MockRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RemoteState {
                script: FailureScript::default(),
                sent: Vec::new(),
                attempts: 0,
                history: HashMap::new(),
                subscribers: HashMap::new(),
            })),
        }
    }

    /// Fail the next `n` sends with a retryable transport error.
    pub async fn fail_next(&self, n: u32) {
        self.state.lock().await.script.fail_remaining = n;
    }

    /// Fail every send with a permanent rejection until [`succeed`] is
    /// called.
    ///
    /// [`succeed`]: MockRemote::succeed
    pub async fn fail_permanent(&self) {
        self.state.lock().await.script.permanent = true;
    }

    /// Clear all scripted failures. Latency from [`set_send_delay`] stays.
    ///
    /// [`set_send_delay`]: MockRemote::set_send_delay
    pub async fn succeed(&self) {
        let mut state = self.state.lock().await;
        state.script.fail_remaining = 0;
        state.script.permanent = false;
    }

    /// Add artificial latency to every send.
    pub async fn set_send_delay(&self, delay: Duration) {
        self.state.lock().await.script.send_delay = Some(delay);
    }

    /// Successful sends, in order, with their assigned ids.
    pub async fn sent_messages(&self) -> Vec<(OutgoingMessage, MessageId)> {
        self.state.lock().await.sent.clone()
    }

    /// Ids the mock assigned to successful sends.
    pub async fn sent_ids(&self) -> Vec<MessageId> {
        self.state
            .lock()
            .await
            .sent
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Count of send attempts, including failed ones.
    pub async fn sent_count(&self) -> usize {
        self.state.lock().await.attempts
    }

    /// Seed confirmed history for a conversation. Messages are kept sorted
    /// ascending by `created_at`.
    pub async fn seed_history(&self, conversation: &ConversationId, messages: Vec<Message>) {
        let mut state = self.state.lock().await;
        let history = state.history.entry(conversation.clone()).or_default();
        history.extend(messages);
        history.sort_by_key(|m| m.created_at);
    }

    /// Push a fresh snapshot to every live subscriber of `conversation`.
    pub async fn push_snapshot(&self, conversation: &ConversationId, messages: Vec<Message>) {
        let mut state = self.state.lock().await;
        {
            let history = state.history.entry(conversation.clone()).or_default();
            *history = messages.clone();
            history.sort_by_key(|m| m.created_at);
        }
        if let Some(senders) = state.subscribers.get_mut(conversation) {
            senders.retain(|tx| {
                tx.try_send(SubscriptionEvent::Snapshot(messages.clone()))
                    .is_ok()
            });
        }
    }

    /// Break every live subscription for `conversation`: each subscriber
    /// receives a transport error and its receiver then ends.
    pub async fn push_error(&self, conversation: &ConversationId, reason: &str) {
        let mut state = self.state.lock().await;
        if let Some(senders) = state.subscribers.remove(conversation) {
            for tx in senders {
                let _ = tx
                    .try_send(SubscriptionEvent::TransportError(reason.to_string()));
                // Dropping the sender ends the receiver after the error.
            }
        }
    }

    /// Number of live subscription feeds for `conversation`.
    pub async fn active_subscriptions(&self, conversation: &ConversationId) -> usize {
        let mut state = self.state.lock().await;
        if let Some(senders) = state.subscribers.get_mut(conversation) {
            senders.retain(|tx| !tx.is_closed());
            senders.len()
        } else {
            0
        }
    }

    fn confirm(outgoing: &OutgoingMessage, id: MessageId) -> Message {
        let now = chrono::Utc::now().timestamp_millis();
        Message {
            id,
            conversation_id: outgoing.conversation_id.clone(),
            sender_id: outgoing.sender_id.clone(),
            content: outgoing.content.clone(),
            delivery: DeliveryState::Sent,
            read_by: Vec::new(),
            created_at: now,
            sent_at: Some(now),
            delivered_at: None,
            read_at: None,
            failed_at: None,
        }
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockRemote {
    fn name(&self) -> &str {
        "mock-remote"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Remote
    }

    async fn health_check(&self) -> Result<HealthStatus, GuildsyncError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GuildsyncError> {
        Ok(())
    }
}

#[async_trait]
impl RemoteChannel for MockRemote {
    async fn send(&self, msg: &OutgoingMessage) -> Result<MessageId, GuildsyncError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.attempts += 1;
            state.script.send_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.script.permanent {
            return Err(GuildsyncError::Rejected {
                message: "message rejected by server".to_string(),
            });
        }
        if state.script.fail_remaining > 0 {
            state.script.fail_remaining -= 1;
            return Err(GuildsyncError::Transport {
                message: "scripted connection failure".to_string(),
                source: None,
            });
        }

        let id = MessageId(format!("srv-{}", uuid::Uuid::new_v4()));
        let confirmed = Self::confirm(msg, id.clone());
        state.sent.push((msg.clone(), id.clone()));
        state
            .history
            .entry(msg.conversation_id.clone())
            .or_default()
            .push(confirmed);
        Ok(id)
    }

    async fn query_before(
        &self,
        conversation: &ConversationId,
        before_ms: i64,
        limit: usize,
    ) -> Result<Vec<Message>, GuildsyncError> {
        let state = self.state.lock().await;
        let Some(history) = state.history.get(conversation) else {
            return Ok(Vec::new());
        };
        // Strictly older, newest first, capped at `limit`.
        let mut older: Vec<Message> = history
            .iter()
            .filter(|m| m.created_at < before_ms)
            .cloned()
            .collect();
        older.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        older.truncate(limit);
        Ok(older)
    }

    async fn subscribe(
        &self,
        conversation: &ConversationId,
        limit: Option<usize>,
    ) -> Result<mpsc::Receiver<SubscriptionEvent>, GuildsyncError> {
        let (tx, rx) = mpsc::channel(16);
        let mut state = self.state.lock().await;
        let snapshot = state
            .history
            .get(conversation)
            .map(|history| {
                let skip = limit.map_or(0, |l| history.len().saturating_sub(l));
                history[skip..].to_vec()
            })
            .unwrap_or_default();
        let _ = tx.try_send(SubscriptionEvent::Snapshot(snapshot));
        state
            .subscribers
            .entry(conversation.clone())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildsync_core::types::MessageContent;

    fn outgoing(text: &str) -> OutgoingMessage {
        OutgoingMessage {
            conversation_id: ConversationId("conv-1".into()),
            sender_id: "user-1".into(),
            content: MessageContent::text(text),
        }
    }

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let remote = MockRemote::new();
        remote.fail_next(2).await;

        assert!(remote.send(&outgoing("a")).await.unwrap_err().is_retryable());
        assert!(remote.send(&outgoing("b")).await.unwrap_err().is_retryable());
        let id = remote.send(&outgoing("c")).await.unwrap();
        assert!(id.0.starts_with("srv-"));
        assert_eq!(remote.sent_count().await, 3);
        assert_eq!(remote.sent_ids().await, vec![id]);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retryable() {
        let remote = MockRemote::new();
        remote.fail_permanent().await;
        let err = remote.send(&outgoing("nope")).await.unwrap_err();
        assert!(!err.is_retryable());

        remote.succeed().await;
        remote.send(&outgoing("now fine")).await.unwrap();
    }

    #[tokio::test]
    async fn query_before_is_strictly_older_and_descending() {
        let remote = MockRemote::new();
        let conv = ConversationId("conv-1".into());
        let mut msgs = Vec::new();
        for ts in [100, 200, 300] {
            let mut m = MockRemote::confirm(&outgoing("x"), MessageId(format!("m-{ts}")));
            m.created_at = ts;
            msgs.push(m);
        }
        remote.seed_history(&conv, msgs).await;

        let page = remote.query_before(&conv, 300, 10).await.unwrap();
        let ts: Vec<i64> = page.iter().map(|m| m.created_at).collect();
        assert_eq!(ts, vec![200, 100]);
    }

    #[tokio::test]
    async fn subscription_ends_after_pushed_error() {
        let remote = MockRemote::new();
        let conv = ConversationId("conv-1".into());
        let mut rx = remote.subscribe(&conv, None).await.unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(SubscriptionEvent::Snapshot(_))
        ));

        remote.push_error(&conv, "stream reset").await;
        assert!(matches!(
            rx.recv().await,
            Some(SubscriptionEvent::TransportError(_))
        ));
        assert!(rx.recv().await.is_none());
        assert_eq!(remote.active_subscriptions(&conv).await, 0);
    }
}
