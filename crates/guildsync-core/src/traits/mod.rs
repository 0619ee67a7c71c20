// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the seams the engine consumes.
//!
//! All adapters extend the [`Adapter`] base trait and use `#[async_trait]`
//! for dynamic dispatch compatibility.

pub mod adapter;
pub mod network;
pub mod remote;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use adapter::Adapter;
pub use network::NetworkMonitor;
pub use remote::RemoteChannel;
pub use store::KeyValueStore;
