// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for session rows and the message log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IntakeError;
use crate::types::{LoggedMessage, Session};

/// Durable keyed store of dialogue sessions, one row per contact.
///
/// Writes are full-record and keyed by `contact_id`; implementations never
/// move `last_activity_at` backwards.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Get the session for a contact.
    async fn get_session(&self, contact_id: &str) -> Result<Option<Session>, IntakeError>;

    /// Return the contact's session, creating an `INITIAL` one if none exists.
    ///
    /// An existing session has its `last_activity_at` advanced to `now`.
    async fn get_or_create_session(
        &self,
        contact_id: &str,
        first_message: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, IntakeError>;

    /// Write every field of `session`, inserting the row if it does not exist.
    async fn save_session(&self, session: &Session) -> Result<(), IntakeError>;

    /// Advance `last_activity_at` for an existing session. Missing rows are ignored.
    async fn touch_session(&self, contact_id: &str, now: DateTime<Utc>) -> Result<(), IntakeError>;

    /// List all sessions, most recently active first.
    async fn list_sessions(&self) -> Result<Vec<Session>, IntakeError>;

    /// Delete a single session. Returns true if a row was removed.
    async fn delete_session(&self, contact_id: &str) -> Result<bool, IntakeError>;

    /// Delete sessions idle since before `cutoff`, keeping rows whose opt-out
    /// is still open at `now`. Returns the number of rows deleted.
    async fn delete_inactive_since(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, IntakeError>;

    /// Reset every session to `INITIAL` except those opted out at `now`.
    /// Returns the number of rows reset.
    async fn reset_all_except_blocked(&self, now: DateTime<Utc>) -> Result<u64, IntakeError>;
}

/// Append-only per-contact message history.
#[async_trait]
pub trait MessageLog: Send + Sync + 'static {
    /// Append one message.
    async fn append_message(&self, message: &LoggedMessage) -> Result<(), IntakeError>;

    /// Messages for a contact in chronological order, optionally limited to the
    /// most recent `limit` entries.
    async fn get_history(
        &self,
        contact_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<LoggedMessage>, IntakeError>;
}
