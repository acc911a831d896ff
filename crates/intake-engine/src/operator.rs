// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing queries and overrides on [`Engine`].
//!
//! Mutating operations take the contact's in-flight guard and fail with
//! [`IntakeError::ContactBusy`] rather than racing a running step.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use intake_core::{DialogueState, IntakeError, LoggedMessage, MessageDirection, Session};

use crate::dialogue::NAME_FIELD;
use crate::exclusion::{ExcludedContact, Exclusion};
use crate::guard::InFlightPermit;
use crate::maintenance::MaintenanceReport;
use crate::{Engine, templates};

/// A session plus its live exclusion status.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    pub session: Session,
    pub exclusion: Exclusion,
    /// A step for this contact is running right now.
    pub in_flight: bool,
}

/// One row of the conversation listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub contact_id: String,
    pub dialogue_state: DialogueState,
    pub name: Option<String>,
    pub last_activity_at: DateTime<Utc>,
    pub exclusion: Exclusion,
}

impl Engine {
    /// Current state of one conversation.
    pub async fn get_conversation_state(
        &self,
        contact: &str,
    ) -> Result<ConversationState, IntakeError> {
        let session = self.load(contact).await?;
        let exclusion = self.inner.exclusion.peek(&session, self.inner.clock.now());
        Ok(ConversationState {
            exclusion,
            in_flight: self.inner.guard.is_held(contact),
            session,
        })
    }

    /// Logged messages for a contact, oldest first, optionally only the last `limit`.
    pub async fn get_conversation_history(
        &self,
        contact: &str,
        limit: Option<i64>,
    ) -> Result<Vec<LoggedMessage>, IntakeError> {
        self.inner.log.get_history(contact, limit).await
    }

    /// Every conversation, most recently active first.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, IntakeError> {
        let now = self.inner.clock.now();
        let sessions = self.inner.store.list_sessions().await?;
        Ok(sessions
            .into_iter()
            .map(|s| ConversationSummary {
                exclusion: self.inner.exclusion.peek(&s, now),
                name: s.field(NAME_FIELD).map(str::to_string),
                contact_id: s.contact_id,
                dialogue_state: s.dialogue_state,
                last_activity_at: s.last_activity_at,
            })
            .collect())
    }

    /// Contacts currently opted out or muted, with remaining time.
    pub async fn list_excluded(&self) -> Result<Vec<ExcludedContact>, IntakeError> {
        let now = self.inner.clock.now();
        let sessions = self.inner.store.list_sessions().await?;
        Ok(sessions
            .iter()
            .filter_map(|s| self.inner.exclusion.excluded_entry(s, now))
            .collect())
    }

    /// Return a conversation to `INITIAL`. An active opt-out is kept.
    pub async fn reset_conversation(&self, contact: &str) -> Result<Session, IntakeError> {
        let _permit = self.claim(contact)?;
        let mut session = self.load(contact).await?;
        session.reset_dialogue();
        self.inner.store.save_session(&session).await?;
        info!(contact = %contact, "conversation reset by operator");
        Ok(session)
    }

    /// Lift the opt-out and any mute.
    pub async fn unblock_contact(&self, contact: &str) -> Result<Session, IntakeError> {
        let _permit = self.claim(contact)?;
        let mut session = self.load(contact).await?;
        self.inner.exclusion.lift(&mut session);
        self.inner.store.save_session(&session).await?;
        info!(contact = %contact, "contact unblocked by operator");
        Ok(session)
    }

    /// Hand the conversation to a human and tell the contact.
    pub async fn forward_to_human(&self, contact: &str) -> Result<Session, IntakeError> {
        let _permit = self.claim(contact)?;
        let mut session = self.load(contact).await?;
        session.dialogue_state = DialogueState::ForwardedToHuman;
        session.pending_field = None;
        self.inner.store.save_session(&session).await?;
        info!(contact = %contact, "conversation forwarded to human by operator");

        if !self
            .inner
            .dispatcher
            .send(contact, &templates::forwarded_to_human())
            .await
        {
            warn!(contact = %contact, "forward notice not delivered");
        }
        Ok(session)
    }

    /// Send operator-written text, bypassing the guard and exclusion windows.
    ///
    /// The text is marker-tagged, so its echo is not mistaken for a takeover.
    /// Returns false if the transport did not accept it.
    pub async fn send_custom_message(&self, contact: &str, text: &str) -> bool {
        let sent = self
            .inner
            .dispatcher
            .send_as(contact, text, MessageDirection::Operator)
            .await;
        if sent {
            info!(contact = %contact, "operator message sent");
        }
        sent
    }

    /// Run the stale-session eviction immediately.
    pub async fn trigger_maintenance_now(&self) -> Result<MaintenanceReport, IntakeError> {
        self.inner.maintenance.run_eviction_now().await
    }

    fn claim(&self, contact: &str) -> Result<InFlightPermit, IntakeError> {
        self.inner
            .guard
            .try_acquire(contact)
            .ok_or_else(|| IntakeError::ContactBusy {
                contact: contact.to_string(),
            })
    }

    async fn load(&self, contact: &str) -> Result<Session, IntakeError> {
        self.inner
            .store
            .get_session(contact)
            .await?
            .ok_or_else(|| IntakeError::NotFound {
                contact: contact.to_string(),
            })
    }
}
