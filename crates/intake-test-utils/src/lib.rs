// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Intake integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a real messaging transport.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock transport with event injection and send capture
//! - [`MemoryStore`] - In-memory session store and message log with failure injection
//! - [`ManualClock`] - Wall clock advanced by hand
//! - [`TestHarness`] - Engine wired to the above

pub mod clock;
pub mod harness;
pub mod memory_store;
pub mod mock_channel;

pub use clock::ManualClock;
pub use harness::TestHarness;
pub use memory_store::MemoryStore;
pub use mock_channel::{MockChannel, SentText};
