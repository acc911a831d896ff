// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Intake engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Position of a contact in the scripted intake dialogue.
///
/// The string forms are the persisted representation and must not change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum DialogueState {
    #[strum(serialize = "INITIAL")]
    #[serde(rename = "INITIAL")]
    Initial,
    #[strum(serialize = "WAITING_NAME")]
    #[serde(rename = "WAITING_NAME")]
    WaitingName,
    #[strum(serialize = "WAITING_OPTION")]
    #[serde(rename = "WAITING_OPTION")]
    WaitingOption,
    #[strum(serialize = "OPTION_1_DETAILS")]
    #[serde(rename = "OPTION_1_DETAILS")]
    Option1Details,
    #[strum(serialize = "OPTION_2_DETAILS")]
    #[serde(rename = "OPTION_2_DETAILS")]
    Option2Details,
    #[strum(serialize = "OPTION_3_DETAILS")]
    #[serde(rename = "OPTION_3_DETAILS")]
    Option3Details,
    #[strum(serialize = "OPTION_4_DETAILS")]
    #[serde(rename = "OPTION_4_DETAILS")]
    Option4Details,
    #[strum(serialize = "OPTION_5_DETAILS")]
    #[serde(rename = "OPTION_5_DETAILS")]
    Option5Details,
    #[strum(serialize = "COMPLETED")]
    #[serde(rename = "COMPLETED")]
    Completed,
    #[strum(serialize = "FORWARDED_TO_HUMAN")]
    #[serde(rename = "FORWARDED_TO_HUMAN")]
    ForwardedToHuman,
}

impl DialogueState {
    /// Parses a persisted state string, falling back to [`DialogueState::Initial`]
    /// for values that do not name a known state.
    pub fn parse_or_initial(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(state = raw, "unrecognized dialogue state, treating as INITIAL");
            DialogueState::Initial
        })
    }
}

/// The durable per-contact dialogue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Normalized external contact identifier (e.g. `+5511999990000`).
    pub contact_id: String,
    pub dialogue_state: DialogueState,
    /// Field currently being solicited. Bookkeeping only.
    pub pending_field: Option<String>,
    pub collected_fields: BTreeMap<String, String>,
    /// Text of the message that created the session.
    pub first_message: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Automated replies are suppressed while this lies in the future.
    pub mute_until: Option<DateTime<Utc>>,
    /// Opt-out window. All processing is suppressed while this lies in the future.
    pub blocked_until: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a fresh session in the `INITIAL` state.
    pub fn new(contact_id: impl Into<String>, first_message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            contact_id: contact_id.into(),
            dialogue_state: DialogueState::Initial,
            pending_field: None,
            collected_fields: BTreeMap::new(),
            first_message: first_message.into(),
            created_at: now,
            last_activity_at: now,
            mute_until: None,
            blocked_until: None,
        }
    }

    /// Returns a collected field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.collected_fields.get(name).map(String::as_str)
    }

    /// Stores `value` under `name` unless the field is already set.
    ///
    /// Returns `true` if the value was written.
    pub fn set_field_if_absent(&mut self, name: &str, value: impl Into<String>) -> bool {
        if self.collected_fields.contains_key(name) {
            return false;
        }
        self.collected_fields.insert(name.to_string(), value.into());
        true
    }

    /// Returns the dialogue to `INITIAL`, dropping collected data and the cool-down.
    ///
    /// The opt-out window is left untouched.
    pub fn reset_dialogue(&mut self) {
        self.dialogue_state = DialogueState::Initial;
        self.pending_field = None;
        self.collected_fields.clear();
        self.mute_until = None;
    }

    /// Advances `last_activity_at` to `now` unless it is already later.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    /// Returns true while the opt-out window is open at `now`.
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// Returns true while the cool-down window is open at `now`.
    pub fn is_muted_at(&self, now: DateTime<Utc>) -> bool {
        self.mute_until.is_some_and(|until| until > now)
    }
}

/// A text event delivered by the transport for a one-to-one or group chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Normalized sender identifier.
    pub sender_id: String,
    pub text: String,
    #[serde(default)]
    pub is_group: bool,
}

/// A message sent from the bot's own account, as echoed back by the transport.
///
/// These are either the bot's own tagged sends or a human operator typing
/// from the same account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnMessage {
    /// Normalized identifier of the contact the message was sent to.
    pub recipient_id: String,
    pub text: String,
}

/// Everything a channel adapter can hand to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Inbound(InboundEvent),
    OwnMessage(OwnMessage),
}

/// Connectivity of the messaging transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Transport is starting up.
    Connecting,
    /// The account must be paired; `code` is the pairing artifact (QR payload).
    PairingRequired { code: String },
    /// Transport can send and receive.
    Ready,
    /// Transport lost its session.
    Disconnected { reason: String },
}

impl ChannelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ChannelStatus::Ready)
    }

    /// The pairing code, if the transport is waiting to be paired.
    pub fn pairing_code(&self) -> Option<&str> {
        match self {
            ChannelStatus::PairingRequired { code } => Some(code),
            _ => None,
        }
    }

    /// Health as reported by a channel adapter in this state.
    pub fn health(&self) -> HealthStatus {
        match self {
            ChannelStatus::Ready => HealthStatus::Healthy,
            ChannelStatus::Disconnected { reason } => HealthStatus::Unhealthy(reason.clone()),
            ChannelStatus::Connecting => HealthStatus::Degraded("connecting".to_string()),
            ChannelStatus::PairingRequired { .. } => {
                HealthStatus::Degraded("pairing required".to_string())
            }
        }
    }
}

/// Who produced a logged message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    /// Sent by the contact.
    Inbound,
    /// Sent by the engine through the dispatcher.
    Bot,
    /// Typed by a human operator on the bot's account.
    Operator,
}

/// A single row of the per-contact message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub id: String,
    pub contact_id: String,
    pub direction: MessageDirection,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn dialogue_state_persisted_names() {
        assert_eq!(DialogueState::Option3Details.to_string(), "OPTION_3_DETAILS");
        assert_eq!(
            "FORWARDED_TO_HUMAN".parse::<DialogueState>().unwrap(),
            DialogueState::ForwardedToHuman
        );
        let json = serde_json::to_string(&DialogueState::WaitingName).unwrap();
        assert_eq!(json, "\"WAITING_NAME\"");
    }

    #[test]
    fn garbage_state_falls_back_to_initial() {
        assert_eq!(DialogueState::parse_or_initial("WAITING_FOR_GODOT"), DialogueState::Initial);
        assert_eq!(DialogueState::parse_or_initial("COMPLETED"), DialogueState::Completed);
    }

    #[test]
    fn set_field_if_absent_never_overwrites() {
        let mut s = Session::new("+551100000000", "oi", at(0));
        assert!(s.set_field_if_absent("name", "Maria"));
        assert!(!s.set_field_if_absent("name", "João"));
        assert_eq!(s.field("name"), Some("Maria"));
    }

    #[test]
    fn reset_dialogue_keeps_block() {
        let mut s = Session::new("+551100000000", "oi", at(0));
        s.dialogue_state = DialogueState::Completed;
        s.pending_field = Some("budget".into());
        s.collected_fields.insert("budget".into(), "10k".into());
        s.mute_until = Some(at(300));
        s.blocked_until = Some(at(1_000));

        s.reset_dialogue();

        assert_eq!(s.dialogue_state, DialogueState::Initial);
        assert!(s.pending_field.is_none());
        assert!(s.collected_fields.is_empty());
        assert!(s.mute_until.is_none());
        assert_eq!(s.blocked_until, Some(at(1_000)));
    }

    #[test]
    fn touch_is_monotonic() {
        let mut s = Session::new("+551100000000", "oi", at(100));
        s.touch(at(50));
        assert_eq!(s.last_activity_at, at(100));
        s.touch(at(200));
        assert_eq!(s.last_activity_at, at(200));
    }

    #[test]
    fn windows_are_exclusive_at_the_boundary() {
        let mut s = Session::new("+551100000000", "oi", at(0));
        s.mute_until = Some(at(10));
        s.blocked_until = Some(at(20));
        assert!(s.is_muted_at(at(9)));
        assert!(!s.is_muted_at(at(10)));
        assert!(s.is_blocked_at(at(19)));
        assert!(!s.is_blocked_at(at(20)));
    }

    #[test]
    fn channel_status_serializes_tagged() {
        let status = ChannelStatus::PairingRequired { code: "2@abc".into() };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"pairing_required\""));
        assert_eq!(status.pairing_code(), Some("2@abc"));
        assert!(!status.is_ready());
        assert!(ChannelStatus::Ready.is_ready());
    }

    #[test]
    fn inbound_event_defaults_to_direct_chat() {
        let ev: InboundEvent =
            serde_json::from_str(r#"{"sender_id":"+5511","text":"oi"}"#).unwrap();
        assert!(!ev.is_group);
    }

    proptest::proptest! {
        #[test]
        fn touch_never_moves_backwards(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let mut s = Session::new("c", "", at(a));
            s.touch(at(b));
            proptest::prop_assert_eq!(s.last_activity_at, at(a.max(b)));
        }
    }
}
