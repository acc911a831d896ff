// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD and bulk maintenance operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use intake_core::{DialogueState, IntakeError, Session};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, format_ts, map_tr_err, parse_ts};

const SESSION_COLUMNS: &str = "contact_id, dialogue_state, pending_field, collected_fields, \
     first_message, created_at, last_activity_at, mute_until, blocked_until";

fn row_to_session(row: &Row<'_>) -> Result<Session, rusqlite::Error> {
    let state: String = row.get(1)?;
    let fields_json: String = row.get(3)?;
    let collected_fields: BTreeMap<String, String> = serde_json::from_str(&fields_json)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let mute_until: Option<String> = row.get(7)?;
    let blocked_until: Option<String> = row.get(8)?;

    Ok(Session {
        contact_id: row.get(0)?,
        dialogue_state: DialogueState::parse_or_initial(&state),
        pending_field: row.get(2)?,
        collected_fields,
        first_message: row.get(4)?,
        created_at: parse_ts(&row.get::<_, String>(5)?)?,
        last_activity_at: parse_ts(&row.get::<_, String>(6)?)?,
        mute_until: mute_until.as_deref().map(parse_ts).transpose()?,
        blocked_until: blocked_until.as_deref().map(parse_ts).transpose()?,
    })
}

fn fields_to_json(fields: &BTreeMap<String, String>) -> Result<String, IntakeError> {
    serde_json::to_string(fields).map_err(|e| IntakeError::Storage {
        source: Box::new(e),
    })
}

/// Get a session by contact.
pub async fn get_session(db: &Database, contact_id: &str) -> Result<Option<Session>, IntakeError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE contact_id = ?1"),
                params![contact_id],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Return the contact's session, inserting a fresh `INITIAL` row when absent.
///
/// An existing row only has its activity timestamp advanced.
pub async fn get_or_create_session(
    db: &Database,
    contact_id: &str,
    first_message: &str,
    now: DateTime<Utc>,
) -> Result<Session, IntakeError> {
    let contact_id = contact_id.to_string();
    let first_message = first_message.to_string();
    let now = format_ts(&now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO sessions (contact_id, dialogue_state, collected_fields, first_message,
                                       created_at, last_activity_at)
                 VALUES (?1, 'INITIAL', '{}', ?2, ?3, ?3)
                 ON CONFLICT(contact_id) DO UPDATE
                 SET last_activity_at = MAX(last_activity_at, excluded.last_activity_at)",
                params![contact_id, first_message, now],
            )?;
            let session = tx.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE contact_id = ?1"),
                params![contact_id],
                row_to_session,
            )?;
            tx.commit()?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Write every field of a session, inserting it if needed.
///
/// `last_activity_at` is written as the later of the stored and the new value.
pub async fn save_session(db: &Database, session: &Session) -> Result<(), IntakeError> {
    let fields = fields_to_json(&session.collected_fields)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (contact_id, dialogue_state, pending_field, collected_fields,
                                       first_message, created_at, last_activity_at,
                                       mute_until, blocked_until)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(contact_id) DO UPDATE SET
                     dialogue_state = excluded.dialogue_state,
                     pending_field = excluded.pending_field,
                     collected_fields = excluded.collected_fields,
                     last_activity_at = MAX(last_activity_at, excluded.last_activity_at),
                     mute_until = excluded.mute_until,
                     blocked_until = excluded.blocked_until",
                params![
                    session.contact_id,
                    session.dialogue_state.to_string(),
                    session.pending_field,
                    fields,
                    session.first_message,
                    format_ts(&session.created_at),
                    format_ts(&session.last_activity_at),
                    session.mute_until.as_ref().map(format_ts),
                    session.blocked_until.as_ref().map(format_ts),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Advance the activity timestamp of an existing session.
pub async fn touch_session(
    db: &Database,
    contact_id: &str,
    now: DateTime<Utc>,
) -> Result<(), IntakeError> {
    let contact_id = contact_id.to_string();
    let now = format_ts(&now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET last_activity_at = MAX(last_activity_at, ?2)
                 WHERE contact_id = ?1",
                params![contact_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List all sessions, most recently active first.
pub async fn list_sessions(db: &Database) -> Result<Vec<Session>, IntakeError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY last_activity_at DESC"
            ))?;
            let rows = stmt.query_map([], row_to_session)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one session. Returns true if a row was removed.
pub async fn delete_session(db: &Database, contact_id: &str) -> Result<bool, IntakeError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE contact_id = ?1",
                params![contact_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete sessions idle since before `cutoff`, sparing rows still opted out at `now`.
pub async fn delete_inactive_since(
    db: &Database,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, IntakeError> {
    let cutoff = format_ts(&cutoff);
    let now = format_ts(&now);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM sessions
                 WHERE last_activity_at < ?1
                   AND (blocked_until IS NULL OR blocked_until <= ?2)",
                params![cutoff, now],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Reset every session that is not opted out at `now` and is not already pristine.
pub async fn reset_all_except_blocked(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<u64, IntakeError> {
    let now = format_ts(&now);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE sessions
                 SET dialogue_state = 'INITIAL',
                     pending_field = NULL,
                     collected_fields = '{}',
                     mute_until = NULL
                 WHERE (blocked_until IS NULL OR blocked_until <= ?1)
                   AND (dialogue_state != 'INITIAL'
                        OR pending_field IS NOT NULL
                        OR collected_fields != '{}'
                        OR mute_until IS NOT NULL)",
                params![now],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(map_tr_err)
}
