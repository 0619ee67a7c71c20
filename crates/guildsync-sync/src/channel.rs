// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live conversation subscriptions.
//!
//! [`SyncChannel`] keeps one subscription per [`listen`] call open against
//! the remote channel and owns the reconnect branch: a transport error on
//! the stream never reaches the consumer as an empty list. The last
//! known-good list is retained, redelivered, and the channel resubscribes
//! internally on the same remote reference.
//!
//! [`listen`]: SyncChannel::listen

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use guildsync_config::SyncConfig;
use guildsync_core::{ConversationId, Message, RemoteChannel, SubscriptionEvent};

type MessagesCallback = Arc<dyn Fn(Vec<Message>) + Send + Sync>;

/// Consumer-facing state for one live subscription.
///
/// Deliveries serialize on the `last_good` lock and the callback fires
/// while it is held, which is what makes `unsubscribe` synchronous: once
/// `closed` is set and that lock taken, any in-flight delivery has already
/// completed and no later one can start. `delivering` names the thread
/// currently inside the callback so `unsubscribe` can tell a reentrant
/// call apart from a concurrent one and not wait on the lock the caller
/// already holds.
struct Gate {
    closed: AtomicBool,
    delivering: Mutex<Option<ThreadId>>,
    last_good: Mutex<Option<Vec<Message>>>,
}

/// Handle to one live subscription; drop or [`unsubscribe`] to release it.
///
/// [`unsubscribe`]: SyncHandle::unsubscribe
pub struct SyncHandle {
    gate: Arc<Gate>,
    cancel: CancellationToken,
}

impl SyncHandle {
    /// Release the subscription and clear the retained last-known-good
    /// list. After this returns no further callback fires; when called
    /// from inside the callback itself, the in-flight delivery is the
    /// caller and no later one starts. Idempotent.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
        self.gate.closed.store(true, Ordering::SeqCst);
        let reentrant = self
            .gate
            .delivering
            .lock()
            .unwrap()
            .is_some_and(|id| id == std::thread::current().id());
        if reentrant {
            // The caller holds the delivery lock; `deliver` clears the
            // retained list when the callback returns.
            return;
        }
        // Taking the lock waits out a delivery in flight on another thread.
        let mut last_good = self.gate.last_good.lock().unwrap();
        *last_good = None;
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Factory for live conversation subscriptions.
pub struct SyncChannel {
    config: SyncConfig,
    remote: Arc<dyn RemoteChannel>,
}

impl SyncChannel {
    pub fn new(config: SyncConfig, remote: Arc<dyn RemoteChannel>) -> Self {
        Self { config, remote }
    }

    /// Open a live subscription for `conversation`.
    ///
    /// Every update delivers the full current message list, ascending by
    /// server timestamp, to `on_messages`. `limit` scopes the subscription
    /// to the most recent N messages (the configured `initial_limit` when
    /// `None`); older history is loaded on demand through pagination.
    pub fn listen<F>(
        &self,
        conversation: ConversationId,
        limit: Option<usize>,
        on_messages: F,
    ) -> SyncHandle
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        let gate = Arc::new(Gate {
            closed: AtomicBool::new(false),
            delivering: Mutex::new(None),
            last_good: Mutex::new(None),
        });
        let cancel = CancellationToken::new();
        let callback: MessagesCallback = Arc::new(on_messages);

        let task = SubscriptionTask {
            remote: Arc::clone(&self.remote),
            conversation,
            limit: limit.unwrap_or(self.config.initial_limit),
            resubscribe_delay: Duration::from_millis(self.config.resubscribe_delay_ms),
            gate: Arc::clone(&gate),
            callback,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run());

        SyncHandle { gate, cancel }
    }
}

struct SubscriptionTask {
    remote: Arc<dyn RemoteChannel>,
    conversation: ConversationId,
    limit: usize,
    resubscribe_delay: Duration,
    gate: Arc<Gate>,
    callback: MessagesCallback,
    cancel: CancellationToken,
}

impl SubscriptionTask {
    async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            match self
                .remote
                .subscribe(&self.conversation, Some(self.limit))
                .await
            {
                Ok(mut rx) => loop {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        event = rx.recv() => match event {
                            Some(SubscriptionEvent::Snapshot(messages)) => {
                                self.deliver(messages);
                            }
                            Some(SubscriptionEvent::TransportError(reason)) => {
                                warn!(
                                    conversation = %self.conversation.0,
                                    reason = %reason,
                                    "subscription broke, keeping last-good list"
                                );
                                self.redeliver_last_good();
                                break;
                            }
                            None => {
                                debug!(
                                    conversation = %self.conversation.0,
                                    "subscription stream ended"
                                );
                                break;
                            }
                        },
                    }
                },
                Err(err) => {
                    warn!(
                        conversation = %self.conversation.0,
                        error = %err,
                        "could not open subscription"
                    );
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.resubscribe_delay) => {
                    debug!(conversation = %self.conversation.0, "resubscribing");
                }
            }
        }
    }

    /// Deliver an authoritative snapshot and retain it as last-known-good.
    fn deliver(&self, mut messages: Vec<Message>) {
        messages.sort_by_key(|m| m.created_at);
        // Retention, the closed check, and the callback happen under the
        // delivery lock so an unsubscribe that returned cannot be followed
        // by a delivery.
        let mut last_good = self.gate.last_good.lock().unwrap();
        if self.gate.closed.load(Ordering::SeqCst) {
            return;
        }
        *last_good = Some(messages.clone());
        *self.gate.delivering.lock().unwrap() = Some(std::thread::current().id());
        (self.callback)(messages);
        *self.gate.delivering.lock().unwrap() = None;
        // An unsubscribe issued from inside the callback could not take
        // the lock held here; finish its cleanup for it.
        if self.gate.closed.load(Ordering::SeqCst) {
            *last_good = None;
        }
    }

    /// A flaky stream must never blank out the conversation: hand the
    /// consumer the retained list again instead of an empty one.
    fn redeliver_last_good(&self) {
        let mut last_good = self.gate.last_good.lock().unwrap();
        if self.gate.closed.load(Ordering::SeqCst) {
            return;
        }
        let Some(last) = last_good.clone() else {
            return;
        };
        *self.gate.delivering.lock().unwrap() = Some(std::thread::current().id());
        (self.callback)(last);
        *self.gate.delivering.lock().unwrap() = None;
        if self.gate.closed.load(Ordering::SeqCst) {
            *last_good = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildsync_core::types::{MessageContent, MessageId, OutgoingMessage};
    use guildsync_core::DeliveryState;
    use guildsync_test_utils::MockRemote;
    use std::sync::Mutex as StdMutex;

    fn message(id: &str, created_at: i64) -> Message {
        Message {
            id: MessageId(id.to_string()),
            conversation_id: ConversationId("conv-1".into()),
            sender_id: "user-1".into(),
            content: MessageContent::text(format!("msg {id}")),
            delivery: DeliveryState::Sent,
            read_by: Vec::new(),
            created_at,
            sent_at: Some(created_at),
            delivered_at: None,
            read_at: None,
            failed_at: None,
        }
    }

    fn test_config() -> SyncConfig {
        SyncConfig {
            resubscribe_delay_ms: 10,
            ..SyncConfig::default()
        }
    }

    /// Collects every delivered list for assertion.
    struct Recorder {
        deliveries: Arc<StdMutex<Vec<Vec<Message>>>>,
    }

    impl Recorder {
        fn new() -> (Self, impl Fn(Vec<Message>) + Send + Sync + 'static) {
            let deliveries = Arc::new(StdMutex::new(Vec::new()));
            let sink = Arc::clone(&deliveries);
            (
                Self { deliveries },
                move |messages| sink.lock().unwrap().push(messages),
            )
        }

        fn count(&self) -> usize {
            self.deliveries.lock().unwrap().len()
        }

        fn last(&self) -> Option<Vec<Message>> {
            self.deliveries.lock().unwrap().last().cloned()
        }

        async fn wait_for(&self, n: usize) {
            tokio::time::timeout(Duration::from_secs(2), async {
                while self.count() < n {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .unwrap_or_else(|_| {
                panic!("expected {n} deliveries, saw {}", self.count())
            });
        }
    }

    #[tokio::test]
    async fn initial_snapshot_is_delivered_ascending() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        remote
            .seed_history(&conv, vec![message("m2", 200), message("m1", 100)])
            .await;
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        let (recorder, on_messages) = Recorder::new();
        let handle = channel.listen(conv.clone(), None, on_messages);
        recorder.wait_for(1).await;

        let ids: Vec<String> = recorder
            .last()
            .unwrap()
            .iter()
            .map(|m| m.id.0.clone())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn transient_error_redelivers_last_good_then_resubscribes() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        remote.seed_history(&conv, vec![message("m1", 100)]).await;
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        let (recorder, on_messages) = Recorder::new();
        let handle = channel.listen(conv.clone(), None, on_messages);
        recorder.wait_for(1).await;

        remote.push_error(&conv, "stream reset").await;
        // The consumer sees its retained list again, never an empty one.
        recorder.wait_for(2).await;
        let redelivered = recorder.last().unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].id.0, "m1");

        // The internal resubscribe picks the live feed back up (the fresh
        // subscription replays the seeded snapshot).
        recorder.wait_for(3).await;
        remote
            .push_snapshot(&conv, vec![message("m1", 100), message("m2", 200)])
            .await;
        recorder.wait_for(4).await;
        assert_eq!(recorder.last().unwrap().len(), 2);
        for delivery in recorder.deliveries.lock().unwrap().iter() {
            assert!(!delivery.is_empty(), "empty list leaked through a transient error");
        }
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn unsubscribe_stops_deliveries_synchronously() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        remote.seed_history(&conv, vec![message("m1", 100)]).await;
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        let (recorder, on_messages) = Recorder::new();
        let handle = channel.listen(conv.clone(), None, on_messages);
        recorder.wait_for(1).await;

        handle.unsubscribe();
        let after_unsubscribe = recorder.count();
        assert!(!handle.is_active());

        remote
            .push_snapshot(&conv, vec![message("m1", 100), message("m2", 200)])
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(recorder.count(), after_unsubscribe);

        // Idempotent.
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn unsubscribe_from_inside_the_callback_completes() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        remote.seed_history(&conv, vec![message("m1", 100)]).await;
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        // The handle only exists once `listen` returns, so the callback
        // reaches it through a shared slot.
        let slot: Arc<StdMutex<Option<SyncHandle>>> = Arc::new(StdMutex::new(None));
        let fired = Arc::new(StdMutex::new(0usize));
        let cb_slot = Arc::clone(&slot);
        let cb_fired = Arc::clone(&fired);
        let handle = channel.listen(conv.clone(), None, move |_| {
            *cb_fired.lock().unwrap() += 1;
            if let Some(handle) = cb_slot.lock().unwrap().as_ref() {
                handle.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(handle);

        // Keep pushing snapshots until a delivery that sees the slot
        // populated tears the subscription down from within the callback.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !slot.lock().unwrap().as_ref().unwrap().is_active() {
                    break;
                }
                remote
                    .push_snapshot(&conv, vec![message("m1", 100), message("m2", 200)])
                    .await;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("unsubscribe from inside the callback never completed");

        let after = *fired.lock().unwrap();
        remote.push_snapshot(&conv, vec![message("m3", 300)]).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*fired.lock().unwrap(), after);
    }

    #[tokio::test]
    async fn limit_scopes_subscription_to_most_recent() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        let history: Vec<Message> = (0..10)
            .map(|i| message(&format!("m{i}"), 100 + i as i64))
            .collect();
        remote.seed_history(&conv, history).await;
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        let (recorder, on_messages) = Recorder::new();
        let handle = channel.listen(conv.clone(), Some(3), on_messages);
        recorder.wait_for(1).await;

        let ids: Vec<String> = recorder
            .last()
            .unwrap()
            .iter()
            .map(|m| m.id.0.clone())
            .collect();
        assert_eq!(ids, vec!["m7", "m8", "m9"]);
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn drop_releases_the_subscription() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        let (recorder, on_messages) = Recorder::new();
        let handle = channel.listen(conv.clone(), None, on_messages);
        recorder.wait_for(1).await;
        drop(handle);

        tokio::time::timeout(Duration::from_secs(2), async {
            while remote.active_subscriptions(&conv).await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscription not released after drop");
    }

    #[tokio::test]
    async fn allows_sending_messages_while_subscribed() {
        let remote = Arc::new(MockRemote::new());
        let conv = ConversationId("conv-1".into());
        let channel = SyncChannel::new(test_config(), Arc::clone(&remote) as Arc<dyn RemoteChannel>);

        let (recorder, on_messages) = Recorder::new();
        let handle = channel.listen(conv.clone(), None, on_messages);
        recorder.wait_for(1).await;

        // A confirmed send shows up in the next pushed snapshot.
        remote
            .send(&OutgoingMessage {
                conversation_id: conv.clone(),
                sender_id: "user-1".into(),
                content: MessageContent::text("live"),
            })
            .await
            .unwrap();
        let history = remote.query_before(&conv, i64::MAX, 10).await.unwrap();
        remote.push_snapshot(&conv, history).await;
        recorder.wait_for(2).await;
        assert_eq!(recorder.last().unwrap().len(), 1);
        handle.unsubscribe();
    }
}
