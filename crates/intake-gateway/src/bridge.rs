// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter for an HTTP transport bridge.
//!
//! A sidecar process owns the messaging session. It POSTs inbound texts,
//! own-account echoes and status changes to `/bridge/events`, and accepts
//! outbound sends as JSON POSTs on `outbound_url`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

use intake_config::model::BridgeConfig;
use intake_core::{
    ChannelAdapter, ChannelEvent, ChannelStatus, HealthStatus, InboundEvent, IntakeError,
    OwnMessage, PluginAdapter,
};

/// Suffix the transport uses for one-to-one chat identifiers.
const DIRECT_SUFFIX: &str = "@c.us";

/// Suffix the transport uses for group chat identifiers.
const GROUP_SUFFIX: &str = "@g.us";

/// An event posted by the bridge sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A text received from a chat.
    Message { from: String, text: String },
    /// A text sent from the bot's own account.
    OwnMessage { to: String, text: String },
    /// Transport connectivity changed.
    Status(ChannelStatus),
}

/// Outbound send request posted to the bridge.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    chat_id: String,
    text: &'a str,
}

/// Converts a transport chat identifier into a contact id (`+5511...`).
///
/// Returns `None` for group chats.
pub fn normalize_contact(raw: &str) -> Option<String> {
    if raw.ends_with(GROUP_SUFFIX) {
        return None;
    }
    let digits = raw.strip_suffix(DIRECT_SUFFIX).unwrap_or(raw);
    let digits = digits.trim_start_matches('+');
    Some(format!("+{digits}"))
}

/// Converts a contact id back into the transport's chat identifier.
pub fn to_chat_id(contact: &str) -> String {
    if contact.contains('@') {
        return contact.to_string();
    }
    format!("{}{DIRECT_SUFFIX}", contact.trim_start_matches('+'))
}

/// Handle for feeding bridge events into a [`BridgeChannel`].
#[derive(Clone)]
pub struct BridgeIngress {
    events: mpsc::Sender<ChannelEvent>,
    status: Arc<watch::Sender<ChannelStatus>>,
}

impl BridgeIngress {
    /// Translate and queue one bridge event.
    pub async fn accept(&self, event: BridgeEvent) -> Result<(), IntakeError> {
        let event = match event {
            BridgeEvent::Status(status) => {
                info!(status = ?status, "bridge status changed");
                self.status.send_replace(status);
                return Ok(());
            }
            BridgeEvent::Message { from, text } => {
                let (sender_id, is_group) = match normalize_contact(&from) {
                    Some(contact) => (contact, false),
                    None => (from, true),
                };
                ChannelEvent::Inbound(InboundEvent {
                    sender_id,
                    text,
                    is_group,
                })
            }
            BridgeEvent::OwnMessage { to, text } => match normalize_contact(&to) {
                Some(recipient_id) => ChannelEvent::OwnMessage(OwnMessage { recipient_id, text }),
                None => {
                    debug!(chat = %to, "own message to group ignored");
                    return Ok(());
                }
            },
        };

        self.events
            .send(event)
            .await
            .map_err(|_| IntakeError::channel("bridge event queue closed"))
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }
}

/// Channel adapter backed by the HTTP bridge.
pub struct BridgeChannel {
    config: BridgeConfig,
    client: reqwest::Client,
    ingress: BridgeIngress,
    events: Mutex<mpsc::Receiver<ChannelEvent>>,
}

impl BridgeChannel {
    pub fn new(config: BridgeConfig) -> Result<Self, IntakeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IntakeError::Channel {
                message: format!("failed to build bridge HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (status, _) = watch::channel(ChannelStatus::Connecting);
        Ok(Self {
            config,
            client,
            ingress: BridgeIngress {
                events: tx,
                status: Arc::new(status),
            },
            events: Mutex::new(rx),
        })
    }

    /// Handle used by the gateway's `/bridge/events` route.
    pub fn ingress(&self) -> BridgeIngress {
        self.ingress.clone()
    }
}

#[async_trait]
impl PluginAdapter for BridgeChannel {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        Ok(self.ingress.status().health())
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        self.events.lock().await.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for BridgeChannel {
    async fn connect(&self) -> Result<(), IntakeError> {
        match &self.config.outbound_url {
            Some(url) => info!(outbound_url = %url, "bridge channel connected"),
            None => warn!("bridge outbound_url not set, replies will not be delivered"),
        }
        Ok(())
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), IntakeError> {
        let Some(url) = &self.config.outbound_url else {
            return Err(IntakeError::channel("bridge outbound_url not configured"));
        };

        let mut request = self.client.post(url).json(&SendRequest {
            chat_id: to_chat_id(chat_id),
            text,
        });
        if let Some(token) = &self.config.outbound_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| IntakeError::Channel {
            message: format!("bridge send failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        response
            .error_for_status()
            .map_err(|e| IntakeError::Channel {
                message: format!("bridge rejected send: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn receive(&self) -> Result<ChannelEvent, IntakeError> {
        let mut rx = self.events.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| IntakeError::channel("bridge event stream closed"))
    }

    fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.ingress.status.subscribe()
    }
}
