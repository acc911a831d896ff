// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait where they have a
//! lifecycle, and use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use storage::{MessageLog, SessionStore};
