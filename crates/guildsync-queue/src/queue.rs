// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The offline message queue.
//!
//! [`OfflineQueue`] owns the list of not-yet-confirmed messages, persists it
//! through the [`KeyValueStore`] seam, and drives retries from two
//! independent triggers funneling into one idempotent entry point:
//! a connectivity-change event and a lazy periodic timer. New sends are
//! accepted immediately even while a retry cycle is in flight for other
//! messages; a per-message in-flight set keeps concurrent cycles from
//! interleaving attempts for the same id.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use guildsync_config::QueueConfig;
use guildsync_core::{
    GuildsyncError, KeyValueStore, MessageContent, MessageId, NetworkMonitor, OutgoingMessage,
    QueueEntryStatus, QueueStatus, QueuedMessage, RemoteChannel,
};

use crate::backoff;

/// Outcome of a single delivery attempt, applied under the state lock.
enum AttemptOutcome {
    Confirmed(MessageId),
    Retryable(String),
    Permanent(String),
}

struct QueueState {
    entries: Vec<QueuedMessage>,
    /// Ids with a delivery attempt currently in flight.
    in_flight: HashSet<MessageId>,
    /// Set when a persistence write failed; the in-memory list stays the
    /// session's source of truth and the write is retried next cycle.
    dirty: bool,
}

struct QueueInner {
    config: QueueConfig,
    remote: Arc<dyn RemoteChannel>,
    store: Arc<dyn KeyValueStore>,
    network: Arc<dyn NetworkMonitor>,
    state: Mutex<QueueState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// Persistent offline retry queue.
///
/// Explicitly constructed and torn down (`initialize` / `destroy`); owns its
/// in-memory list, its persisted snapshot, and its timer handle. Only this
/// type writes the configured storage key.
#[derive(Clone)]
pub struct OfflineQueue {
    inner: Arc<QueueInner>,
}

impl OfflineQueue {
    pub fn new(
        config: QueueConfig,
        remote: Arc<dyn RemoteChannel>,
        store: Arc<dyn KeyValueStore>,
        network: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                config,
                remote,
                store,
                network,
                state: Mutex::new(QueueState {
                    entries: Vec::new(),
                    in_flight: HashSet::new(),
                    dirty: false,
                }),
                timer: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Load the persisted snapshot (read-once) and start the connectivity
    /// watcher. Processes the queue immediately when online with restored
    /// entries.
    pub async fn initialize(&self) -> Result<(), GuildsyncError> {
        let restored = match self.inner.store.get(&self.inner.config.storage_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<QueuedMessage>>(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = %err, "discarding unreadable queue snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "could not read queue snapshot");
                Vec::new()
            }
        };

        let actionable = {
            let mut state = self.inner.state.lock().await;
            state.entries = restored;
            // An attempt interrupted by process death is no longer in flight.
            for entry in &mut state.entries {
                if entry.status == QueueEntryStatus::Retrying {
                    entry.status = QueueEntryStatus::Pending;
                }
            }
            if !state.entries.is_empty() {
                info!(count = state.entries.len(), "restored queued messages");
            }
            actionable_count(&state.entries)
        };

        self.spawn_network_watcher();

        if actionable > 0 && self.inner.network.is_connected().await {
            self.inner.process_queue().await;
            QueueInner::start_timer(&self.inner).await;
        }
        Ok(())
    }

    /// Stop the watcher and timer. The persisted snapshot is left in place
    /// for the next session.
    pub async fn destroy(&self) {
        self.inner.shutdown.cancel();
        self.inner.stop_timer().await;
    }

    /// Accept a send request.
    ///
    /// Attempts one direct write; on success returns the confirmed id and
    /// persists nothing. On failure the message is staged (already `Failed`
    /// for permanent rejections) and the staging id is returned.
    pub async fn enqueue(&self, outgoing: OutgoingMessage) -> Result<MessageId, GuildsyncError> {
        validate(&outgoing, self.inner.config.max_text_len)?;

        match self.inner.remote.send(&outgoing).await {
            Ok(confirmed) => {
                debug!(id = %confirmed.0, "direct send confirmed");
                Ok(confirmed)
            }
            Err(err) => {
                let staged = self.inner.stage(outgoing, &err).await;
                if err.is_retryable() {
                    QueueInner::start_timer(&self.inner).await;
                }
                Ok(staged)
            }
        }
    }

    /// One idempotent processing pass over all due entries. Safe to call
    /// repeatedly and from any trigger.
    pub async fn process_queue(&self) {
        self.inner.process_queue().await;
    }

    /// Manual user-initiated retry of a (typically failed) message.
    ///
    /// Resets the retry budget and attempts delivery immediately, bypassing
    /// backoff. Returns `false` if the id is not in the queue.
    pub async fn retry_now(&self, id: &MessageId) -> Result<bool, GuildsyncError> {
        {
            let mut state = self.inner.state.lock().await;
            let Some(entry) = state.entries.iter_mut().find(|e| &e.id == id) else {
                warn!(id = %id.0, "manual retry for unknown queue id");
                return Ok(false);
            };
            entry.retry_count = 0;
            entry.status = QueueEntryStatus::Pending;
            entry.failure_reason = None;
            entry.last_retry_at = None;
            self.inner.persist(&mut state).await;
        }
        self.inner.attempt(id.clone()).await;
        Ok(true)
    }

    /// Aggregate counts for UI surfacing.
    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        let mut status = QueueStatus {
            total: state.entries.len(),
            ..QueueStatus::default()
        };
        for entry in &state.entries {
            match entry.status {
                QueueEntryStatus::Pending => status.pending += 1,
                QueueEntryStatus::Retrying => status.retrying += 1,
                QueueEntryStatus::Failed => status.failed += 1,
            }
        }
        status
    }

    /// Failed messages, for rendering inline retry affordances.
    pub async fn failed(&self) -> Vec<QueuedMessage> {
        let state = self.inner.state.lock().await;
        state
            .entries
            .iter()
            .filter(|e| e.status == QueueEntryStatus::Failed)
            .cloned()
            .collect()
    }

    /// Purge failed messages older than the retention window. Pending and
    /// retrying messages are kept regardless of age.
    pub async fn cleanup(&self) {
        let cutoff = now_ms() - i64::from(self.inner.config.retention_days) * 24 * 60 * 60 * 1000;
        let mut state = self.inner.state.lock().await;
        let before = state.entries.len();
        state
            .entries
            .retain(|e| !(e.status == QueueEntryStatus::Failed && e.created_at < cutoff));
        let removed = before - state.entries.len();
        if removed > 0 {
            info!(removed, "purged old failed messages");
            self.inner.persist(&mut state).await;
        }
    }

    /// Drop every entry and remove the persisted key.
    pub async fn clear(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.entries.clear();
            state.in_flight.clear();
            state.dirty = false;
        }
        if let Err(err) = self.inner.store.remove(&self.inner.config.storage_key).await {
            warn!(error = %err, "could not remove queue snapshot");
        }
        self.inner.stop_timer().await;
        info!("cleared message queue");
    }

    fn spawn_network_watcher(&self) {
        let inner = Arc::clone(&self.inner);
        let mut rx = inner.network.watch();
        tokio::spawn(async move {
            let mut was_online = *rx.borrow();
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *rx.borrow();
                        if online && !was_online {
                            info!("network online, processing message queue");
                            inner.process_queue().await;
                            let actionable = {
                                let state = inner.state.lock().await;
                                actionable_count(&state.entries)
                            };
                            if actionable > 0 {
                                QueueInner::start_timer(&inner).await;
                            }
                        } else if !online && was_online {
                            warn!("network offline, pausing message queue");
                            inner.stop_timer().await;
                        }
                        was_online = online;
                    }
                }
            }
        });
    }
}

impl QueueInner {
    /// Create a staging entry for a message whose direct send failed.
    async fn stage(&self, outgoing: OutgoingMessage, err: &GuildsyncError) -> MessageId {
        let id = MessageId(format!("queued-{}", uuid::Uuid::new_v4()));
        let status = if err.is_retryable() {
            QueueEntryStatus::Pending
        } else {
            QueueEntryStatus::Failed
        };
        let now = now_ms();
        let entry = QueuedMessage {
            id: id.clone(),
            conversation_id: outgoing.conversation_id,
            sender_id: outgoing.sender_id,
            content: outgoing.content,
            status,
            retry_count: 0,
            // Never retried, so the first processing pass picks it up
            // without waiting out a backoff window.
            last_retry_at: None,
            created_at: now,
            failure_reason: Some(err.to_string()),
            metadata: Default::default(),
        };

        let mut state = self.state.lock().await;
        state.entries.push(entry);
        self.persist(&mut state).await;
        info!(id = %id.0, status = %status, total = state.entries.len(), "staged message");
        id
    }

    async fn process_queue(&self) {
        if !self.network.is_connected().await {
            debug!("skipping queue processing while offline");
            return;
        }

        let now = now_ms();
        let due: Vec<MessageId> = {
            let mut state = self.state.lock().await;
            if state.entries.is_empty() {
                return;
            }
            if state.dirty {
                self.persist(&mut state).await;
            }

            let mut due = Vec::new();
            let mut exhausted = false;
            // Split borrows: eligibility needs the in-flight set alongside
            // mutable entries.
            let QueueState {
                entries, in_flight, ..
            } = &mut *state;
            for entry in entries.iter_mut() {
                if !matches!(
                    entry.status,
                    QueueEntryStatus::Pending | QueueEntryStatus::Retrying
                ) || in_flight.contains(&entry.id)
                {
                    continue;
                }
                if entry.retry_count >= self.config.max_retries {
                    warn!(id = %entry.id.0, max = self.config.max_retries, "retry budget exhausted");
                    entry.status = QueueEntryStatus::Failed;
                    exhausted = true;
                    continue;
                }
                if !backoff::is_due(
                    &self.config.backoff_ms,
                    entry.retry_count,
                    entry.last_retry_at,
                    now,
                ) {
                    continue;
                }
                due.push(entry.id.clone());
            }
            if exhausted {
                self.persist(&mut state).await;
            }
            due
        };

        if !due.is_empty() {
            debug!(count = due.len(), "processing due queue entries");
        }
        for id in due {
            self.attempt(id).await;
        }

        let actionable = {
            let state = self.state.lock().await;
            actionable_count(&state.entries)
        };
        if actionable == 0 {
            self.stop_timer().await;
        }
    }

    /// One delivery attempt for one entry. The in-flight guard makes
    /// concurrent invocations for the same id a no-op.
    async fn attempt(&self, id: MessageId) {
        let outgoing = {
            let mut state = self.state.lock().await;
            if state.in_flight.contains(&id) {
                return;
            }
            let max = self.config.max_retries;
            let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
                return;
            };
            entry.status = QueueEntryStatus::Retrying;
            entry.retry_count += 1;
            entry.last_retry_at = Some(now_ms());
            debug!(id = %id.0, attempt = entry.retry_count, max, "retrying message");
            let outgoing = entry.outgoing();
            state.in_flight.insert(id.clone());
            self.persist(&mut state).await;
            outgoing
        };

        let outcome = match self.remote.send(&outgoing).await {
            Ok(confirmed) => AttemptOutcome::Confirmed(confirmed),
            Err(err) if err.is_retryable() => AttemptOutcome::Retryable(err.to_string()),
            Err(err) => AttemptOutcome::Permanent(err.to_string()),
        };

        let mut state = self.state.lock().await;
        state.in_flight.remove(&id);
        match outcome {
            AttemptOutcome::Confirmed(confirmed) => {
                state.entries.retain(|e| e.id != id);
                info!(id = %id.0, confirmed = %confirmed.0, remaining = state.entries.len(),
                      "queued message delivered");
            }
            AttemptOutcome::Retryable(reason) => {
                if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
                    entry.failure_reason = Some(reason);
                    entry.status = if entry.retry_count >= self.config.max_retries {
                        warn!(id = %id.0, attempts = entry.retry_count, "message failed after final attempt");
                        QueueEntryStatus::Failed
                    } else {
                        // Reconsidered on the next cycle.
                        QueueEntryStatus::Pending
                    };
                }
            }
            AttemptOutcome::Permanent(reason) => {
                if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
                    warn!(id = %id.0, reason = %reason, "message permanently rejected");
                    entry.failure_reason = Some(reason);
                    entry.status = QueueEntryStatus::Failed;
                }
            }
        }
        self.persist(&mut state).await;
    }

    /// Write the snapshot; on failure the in-memory list stays authoritative
    /// and the write is retried on the next processing cycle.
    async fn persist(&self, state: &mut QueueState) {
        let bytes = match serde_json::to_vec(&state.entries) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "could not serialize queue snapshot");
                state.dirty = true;
                return;
            }
        };
        match self.store.set(&self.config.storage_key, &bytes).await {
            Ok(()) => state.dirty = false,
            Err(err) => {
                warn!(error = %err, "could not persist queue snapshot");
                state.dirty = true;
            }
        }
    }

    /// Start the periodic processing timer if it is not already running.
    /// The timer exits on its own once no actionable entries remain.
    async fn start_timer(this: &Arc<Self>) {
        let mut timer = this.timer.lock().await;
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let inner = Arc::clone(this);
        let tick = Duration::from_secs(this.config.tick_interval_secs);
        debug!(interval_secs = this.config.tick_interval_secs, "starting retry timer");
        *timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        inner.process_queue().await;
                        let state = inner.state.lock().await;
                        if actionable_count(&state.entries) == 0 {
                            debug!("queue drained, stopping retry timer");
                            break;
                        }
                    }
                }
            }
        }));
    }

    async fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
            debug!("stopped retry timer");
        }
    }
}

/// Entries the automatic machinery still acts on.
fn actionable_count(entries: &[QueuedMessage]) -> usize {
    entries
        .iter()
        .filter(|e| {
            matches!(
                e.status,
                QueueEntryStatus::Pending | QueueEntryStatus::Retrying
            )
        })
        .count()
}

/// Validation-class checks. Rejected messages never enter the queue.
fn validate(outgoing: &OutgoingMessage, max_text_len: usize) -> Result<(), GuildsyncError> {
    match &outgoing.content {
        MessageContent::Text { text } => {
            if text.trim().is_empty() {
                return Err(GuildsyncError::Validation(
                    "message text is empty after sanitization".to_string(),
                ));
            }
            if text.chars().count() > max_text_len {
                return Err(GuildsyncError::Validation(format!(
                    "message text exceeds {max_text_len} characters"
                )));
            }
        }
        other => {
            if other.attachment_refs().is_empty() {
                return Err(GuildsyncError::Validation(
                    "attachment message has no attachment refs".to_string(),
                ));
            }
            if other
                .text_body()
                .is_some_and(|caption| caption.chars().count() > max_text_len)
            {
                return Err(GuildsyncError::Validation(format!(
                    "caption exceeds {max_text_len} characters"
                )));
            }
        }
    }
    Ok(())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
