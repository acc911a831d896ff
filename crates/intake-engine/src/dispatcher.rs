// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sends through the channel adapter.
//!
//! Every payload carries [`BOT_MARKER`] so the bot's own echoes can be told
//! apart from a human typing on the same account.

use std::sync::Arc;

use intake_core::{
    ChannelAdapter, Clock, LoggedMessage, MessageDirection, MessageLog, SessionStore,
};
use tracing::{debug, warn};

/// Invisible marker appended to every bot-originated payload.
pub const BOT_MARKER: char = '\u{200B}';

/// Returns true if `text` was sent by the dispatcher.
///
/// Only a trailing marker counts: an operator quoting earlier bot text
/// still carries the marker mid-message.
pub fn is_bot_tagged(text: &str) -> bool {
    text.ends_with(BOT_MARKER)
}

/// Sends text to contacts and records the bookkeeping around each send.
#[derive(Clone)]
pub struct Dispatcher {
    channel: Arc<dyn ChannelAdapter>,
    store: Arc<dyn SessionStore>,
    log: Arc<dyn MessageLog>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        store: Arc<dyn SessionStore>,
        log: Arc<dyn MessageLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            channel,
            store,
            log,
            clock,
        }
    }

    /// Send a bot message. Returns false if the transport was not ready or
    /// rejected it. Never retries.
    pub async fn send(&self, contact: &str, text: &str) -> bool {
        self.send_as(contact, text, MessageDirection::Bot).await
    }

    /// Send a message and log it under `direction`.
    pub async fn send_as(&self, contact: &str, text: &str, direction: MessageDirection) -> bool {
        if !self.channel.is_ready() {
            warn!(contact = %contact, "transport not ready, message not sent");
            return false;
        }

        let mut payload = String::with_capacity(text.len() + BOT_MARKER.len_utf8());
        payload.push_str(text);
        payload.push(BOT_MARKER);

        if let Err(e) = self.channel.send_text(contact, &payload).await {
            warn!(contact = %contact, error = %e, "send failed");
            return false;
        }

        let now = self.clock.now();
        if let Err(e) = self.store.touch_session(contact, now).await {
            debug!(contact = %contact, error = %e, "activity touch after send failed");
        }
        let entry = LoggedMessage {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: contact.to_string(),
            direction,
            body: text.to_string(),
            created_at: now,
        };
        if let Err(e) = self.log.append_message(&entry).await {
            debug!(contact = %contact, error = %e, "message log append failed");
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.channel.is_ready()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("channel", &self.channel.name())
            .finish_non_exhaustive()
    }
}
