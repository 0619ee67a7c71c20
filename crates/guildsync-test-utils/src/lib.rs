// SPDX-FileCopyrightText: 2026 Guildsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters for Guildsync integration tests.
//!
//! Provides deterministic, CI-runnable stand-ins for the three external
//! seams without real backends:
//!
//! - [`MockRemote`] - scriptable remote channel with failure injection,
//!   seeded history, and hand-driven subscription feeds
//! - [`MemoryStore`] - in-memory key-value store with a write-failure switch
//! - [`MockNetwork`] - connectivity monitor flipped from the test body

pub mod mock_network;
pub mod mock_remote;
pub mod mock_store;

pub use mock_network::MockNetwork;
pub use mock_remote::MockRemote;
pub use mock_store::MemoryStore;
