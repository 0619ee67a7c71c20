// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capped exponential backoff schedule.
//!
//! The configured table (default 1s, 2s, 4s, 8s, 16s) is indexed by the
//! message's current retry count; attempts beyond the table length reuse the
//! last entry.

use std::time::Duration;

/// Delay to wait before the next attempt for a message with `retry_count`
/// prior attempts.
pub fn delay_for(backoff_ms: &[u64], retry_count: u32) -> Duration {
    if backoff_ms.is_empty() {
        // Config validation rejects this; degrade to immediate retry.
        return Duration::ZERO;
    }
    let idx = (retry_count as usize).min(backoff_ms.len() - 1);
    Duration::from_millis(backoff_ms[idx])
}

/// Whether enough time has elapsed since `last_retry_at` (epoch ms) for a
/// message with `retry_count` prior attempts to be retried at `now_ms`.
///
/// A message that has never been attempted is always due.
pub fn is_due(backoff_ms: &[u64], retry_count: u32, last_retry_at: Option<i64>, now_ms: i64) -> bool {
    match last_retry_at {
        None => true,
        Some(last) => {
            let elapsed = now_ms.saturating_sub(last).max(0) as u128;
            elapsed >= delay_for(backoff_ms, retry_count).as_millis()
        }
    }
}
