// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable events, captured
//! outbound texts and a controllable status watch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, watch};

use intake_core::{
    ChannelAdapter, ChannelEvent, ChannelStatus, HealthStatus, InboundEvent, IntakeError,
    OwnMessage, PluginAdapter,
};

/// One captured outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub chat_id: String,
    /// Payload exactly as handed to the transport, marker included.
    pub text: String,
}

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: events injected via `inject_event()` are returned by `receive()`
/// - **sent**: texts passed to `send_text()` are captured and retrievable via `sent_messages()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<ChannelEvent>>>,
    sent: Arc<Mutex<Vec<SentText>>>,
    notify: Arc<Notify>,
    status: watch::Sender<ChannelStatus>,
    fail_sends: AtomicBool,
    closed: AtomicBool,
}

impl MockChannel {
    /// Create a mock channel that already reports ready.
    pub fn new() -> Self {
        Self::with_status(ChannelStatus::Ready)
    }

    pub fn with_status(status: ChannelStatus) -> Self {
        let (status, _) = watch::channel(status);
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            status,
            fail_sends: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue an event; the next `receive()` returns it.
    pub async fn inject_event(&self, event: ChannelEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Queue a direct-chat text from `sender`.
    pub async fn inject_text(&self, sender: &str, text: &str) {
        self.inject_event(ChannelEvent::Inbound(InboundEvent {
            sender_id: sender.to_string(),
            text: text.to_string(),
            is_group: false,
        }))
        .await;
    }

    /// Queue an own-account message to `recipient`.
    pub async fn inject_own(&self, recipient: &str, text: &str) {
        self.inject_event(ChannelEvent::OwnMessage(OwnMessage {
            recipient_id: recipient.to_string(),
            text: text.to_string(),
        }))
        .await;
    }

    /// End the event stream once the queue drains.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn set_status(&self, status: ChannelStatus) {
        self.status.send_replace(status);
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Get all texts that were sent through `send_text()`.
    pub async fn sent_messages(&self) -> Vec<SentText> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to `chat_id`, in order.
    pub async fn sent_to(&self, chat_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| s.chat_id == chat_id)
            .map(|s| s.text.clone())
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        Ok(self.status.borrow().health())
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&self) -> Result<(), IntakeError> {
        Ok(())
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), IntakeError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(IntakeError::channel("mock send rejected"));
        }
        self.sent.lock().await.push(SentText {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn receive(&self) -> Result<ChannelEvent, IntakeError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(IntakeError::channel("mock event stream closed"));
            }
            self.notify.notified().await;
        }
    }

    fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.subscribe()
    }
}
