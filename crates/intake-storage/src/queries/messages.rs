// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.

use intake_core::{IntakeError, LoggedMessage, MessageDirection};
use rusqlite::{Row, params};

use crate::database::{Database, format_ts, map_tr_err, parse_ts};

fn row_to_message(row: &Row<'_>) -> Result<LoggedMessage, rusqlite::Error> {
    let direction: String = row.get(2)?;
    let direction = direction.parse::<MessageDirection>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(LoggedMessage {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        direction,
        body: row.get(3)?,
        created_at: parse_ts(&row.get::<_, String>(4)?)?,
    })
}

/// Append a message to the log.
pub async fn insert_message(db: &Database, msg: &LoggedMessage) -> Result<(), IntakeError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_log (id, contact_id, direction, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.contact_id,
                    msg.direction.to_string(),
                    msg.body,
                    format_ts(&msg.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages for a contact in chronological order.
///
/// With a `limit`, only the most recent `limit` messages are returned (still oldest first).
pub async fn get_messages_for_contact(
    db: &Database,
    contact_id: &str,
    limit: Option<i64>,
) -> Result<Vec<LoggedMessage>, IntakeError> {
    let contact_id = contact_id.to_string();
    // A negative LIMIT means "no limit" in SQLite.
    let limit = limit.unwrap_or(-1);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, contact_id, direction, body, created_at FROM (
                     SELECT id, contact_id, direction, body, created_at, rowid AS seq
                     FROM message_log WHERE contact_id = ?1
                     ORDER BY created_at DESC, seq DESC
                     LIMIT ?2
                 ) ORDER BY created_at ASC, seq ASC",
            )?;
            let rows = stmt.query_map(params![contact_id, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
