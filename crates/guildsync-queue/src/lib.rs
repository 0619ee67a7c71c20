// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent offline send queue with capped exponential backoff.
//!
//! See [`OfflineQueue`] for the full lifecycle: direct send first, staging
//! on failure, retry cycles driven by a periodic timer and connectivity
//! transitions, and manual retry with a fresh budget.

pub mod backoff;
mod queue;

pub use queue::OfflineQueue;
