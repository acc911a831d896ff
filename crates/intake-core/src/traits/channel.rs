// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the one-to-one messaging transport.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::IntakeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelEvent, ChannelStatus};

/// Adapter for the messaging transport.
///
/// The engine never sees transport-native events: adapters translate them
/// into [`ChannelEvent`]s and expose a plain text send primitive.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&self) -> Result<(), IntakeError>;

    /// Sends `text` verbatim to `chat_id`.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), IntakeError>;

    /// Receives the next event from the transport.
    ///
    /// Returns a channel error containing "closed" once the stream has ended.
    async fn receive(&self) -> Result<ChannelEvent, IntakeError>;

    /// Subscribes to connectivity changes, including the pairing code.
    fn status(&self) -> watch::Receiver<ChannelStatus>;

    /// Returns true if the transport currently reports ready.
    fn is_ready(&self) -> bool {
        self.status().borrow().is_ready()
    }
}
