// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Guildsync engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::delivery::DeliveryState;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
///
/// Client-generated (uuid v4) for staged messages; once the remote store
/// confirms a write, the confirmed record carries the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a seam.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Remote,
    Store,
    Network,
}

/// The kind of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    Voice,
}

/// Message payload, tagged by kind.
///
/// Persisted with an explicit `kind` tag so a queue snapshot round-trip can
/// never lose the payload type. Attachment refs are opaque handles into the
/// app's media store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        caption: Option<String>,
        attachment_refs: Vec<String>,
    },
    File {
        #[serde(default)]
        name: Option<String>,
        attachment_refs: Vec<String>,
    },
    Voice {
        #[serde(default)]
        duration_ms: Option<u64>,
        attachment_refs: Vec<String>,
    },
}

impl MessageContent {
    /// Convenience constructor for plain text messages.
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text { text: text.into() }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessageContent::Text { .. } => MessageKind::Text,
            MessageContent::Image { .. } => MessageKind::Image,
            MessageContent::File { .. } => MessageKind::File,
            MessageContent::Voice { .. } => MessageKind::Voice,
        }
    }

    /// The user-visible text of the payload, if any.
    pub fn text_body(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text),
            MessageContent::Image { caption, .. } => caption.as_deref(),
            _ => None,
        }
    }

    pub fn attachment_refs(&self) -> &[String] {
        match self {
            MessageContent::Text { .. } => &[],
            MessageContent::Image { attachment_refs, .. }
            | MessageContent::File { attachment_refs, .. }
            | MessageContent::Voice { attachment_refs, .. } => attachment_refs,
        }
    }
}

/// Status of a staged message in the offline queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueEntryStatus {
    /// Waiting for the next processing cycle.
    Pending,
    /// A delivery attempt is underway.
    Retrying,
    /// Retry budget exhausted or permanently rejected; manual retry only.
    Failed,
}

/// A send request before it reaches the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub content: MessageContent,
}

/// A message staged in the offline queue, not yet confirmed by the remote store.
///
/// Mutated only by the queue (status, retry bookkeeping); destroyed on
/// confirmed delivery or explicit user discard of a failed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub content: MessageContent,
    pub status: QueueEntryStatus,
    pub retry_count: u32,
    /// Epoch milliseconds of the last delivery attempt.
    #[serde(default)]
    pub last_retry_at: Option<i64>,
    /// Epoch milliseconds when the send intent was created (client clock).
    pub created_at: i64,
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Diagnostic tags only; typed payload data lives in `content`.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl QueuedMessage {
    pub fn outgoing(&self) -> OutgoingMessage {
        OutgoingMessage {
            conversation_id: self.conversation_id.clone(),
            sender_id: self.sender_id.clone(),
            content: self.content.clone(),
        }
    }
}

/// A canonical message confirmed by the remote store.
///
/// `created_at` is the server-assigned timestamp; consumers order by it,
/// never by client enqueue order. A confirmed message never reverts to a
/// queued one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub content: MessageContent,
    pub delivery: DeliveryState,
    /// Participant ids that have read the message.
    #[serde(default)]
    pub read_by: Vec<String>,
    /// Server-assigned epoch milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub sent_at: Option<i64>,
    #[serde(default)]
    pub delivered_at: Option<i64>,
    #[serde(default)]
    pub read_at: Option<i64>,
    #[serde(default)]
    pub failed_at: Option<i64>,
}

/// Aggregate queue counts surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub retrying: usize,
    pub failed: usize,
}

/// One event on a live conversation subscription.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// The full current ordered list of confirmed messages.
    Snapshot(Vec<Message>),
    /// The underlying stream broke; the receiver ends after this event and
    /// the consumer must resubscribe.
    TransportError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_content_kind_accessor() {
        assert_eq!(MessageContent::text("hi").kind(), MessageKind::Text);
        let image = MessageContent::Image {
            caption: None,
            attachment_refs: vec!["ref-1".into()],
        };
        assert_eq!(image.kind(), MessageKind::Image);
        assert_eq!(image.attachment_refs(), ["ref-1".to_string()]);
    }

    #[test]
    fn message_content_round_trips_with_kind_tag() {
        let voice = MessageContent::Voice {
            duration_ms: Some(3200),
            attachment_refs: vec!["voice-7".into()],
        };
        let json = serde_json::to_string(&voice).unwrap();
        assert!(json.contains(r#""kind":"voice""#), "payload tag missing: {json}");
        let back: MessageContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, voice);
    }

    #[test]
    fn queued_message_round_trips() {
        let mut metadata = BTreeMap::new();
        metadata.insert("origin".to_string(), "compose-box".to_string());
        let staged = QueuedMessage {
            id: MessageId("q-1".into()),
            conversation_id: ConversationId("conv-1".into()),
            sender_id: "user-1".into(),
            content: MessageContent::text("offline hello"),
            status: QueueEntryStatus::Pending,
            retry_count: 2,
            last_retry_at: Some(1_700_000_000_000),
            created_at: 1_700_000_000_000,
            failure_reason: Some("connection reset".into()),
            metadata,
        };

        let bytes = serde_json::to_vec(&staged).unwrap();
        let back: QueuedMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.id, staged.id);
        assert_eq!(back.status, QueueEntryStatus::Pending);
        assert_eq!(back.retry_count, 2);
        assert_eq!(back.content, staged.content);
        assert_eq!(back.metadata.get("origin").map(String::as_str), Some("compose-box"));
    }

    #[test]
    fn queue_entry_status_display_round_trip() {
        use std::str::FromStr;

        for status in [
            QueueEntryStatus::Pending,
            QueueEntryStatus::Retrying,
            QueueEntryStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(QueueEntryStatus::from_str(&s).unwrap(), status);
        }
    }
}
