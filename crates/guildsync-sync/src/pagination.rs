// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backward history pagination.
//!
//! Pages are anchored on server timestamps, so repeated calls with the same
//! anchor return the same page as long as nothing is inserted with an
//! earlier timestamp than already-fetched pages.

use std::sync::Arc;

use tracing::debug;

use guildsync_config::SyncConfig;
use guildsync_core::{ConversationId, GuildsyncError, Message, RemoteChannel};

/// One page of older history, ascending for display.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    /// Whether another `load_older` call with this page's oldest timestamp
    /// would return more messages.
    pub has_more: bool,
}

impl HistoryPage {
    /// Anchor for the next page: the oldest timestamp on this one.
    pub fn next_anchor(&self) -> Option<i64> {
        self.messages.first().map(|m| m.created_at)
    }
}

/// Loads conversation history backwards from a timestamp anchor.
pub struct PaginationCursor {
    config: SyncConfig,
    remote: Arc<dyn RemoteChannel>,
}

impl PaginationCursor {
    pub fn new(config: SyncConfig, remote: Arc<dyn RemoteChannel>) -> Self {
        Self { config, remote }
    }

    /// Load one page of messages strictly older than `before_ms`.
    ///
    /// Queries one extra record past the page size; its presence alone
    /// decides `has_more` and it is never exposed. The returned page is
    /// ascending by server timestamp.
    pub async fn load_older(
        &self,
        conversation: &ConversationId,
        before_ms: i64,
        page_size: Option<usize>,
    ) -> Result<HistoryPage, GuildsyncError> {
        let page_size = page_size.unwrap_or(self.config.page_size).max(1);
        let mut batch = self
            .remote
            .query_before(conversation, before_ms, page_size + 1)
            .await?;
        let has_more = batch.len() > page_size;
        batch.truncate(page_size);
        batch.reverse();
        debug!(
            conversation = %conversation.0,
            before_ms,
            count = batch.len(),
            has_more,
            "loaded older history page"
        );
        Ok(HistoryPage {
            messages: batch,
            has_more,
        })
    }
}
