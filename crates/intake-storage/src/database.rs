// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use chrono::{DateTime, NaiveDateTime, Utc};
use intake_core::IntakeError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Fixed-width timestamp layout; lexical order equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Handle to the SQLite database.
///
/// Wraps the single `tokio_rusqlite::Connection` that every query goes through.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, IntakeError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, IntakeError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| IntakeError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| IntakeError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| run_migrations(conn))
            .await
            .map_err(|e| IntakeError::Storage {
                source: format!("migration failed: {e}").into(),
            })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying connection, for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL. The connection closes when the handle is dropped.
    pub async fn close(self) -> Result<(), IntakeError> {
        self.checkpoint().await
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), IntakeError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> IntakeError {
    IntakeError::Storage {
        source: Box::new(e),
    }
}

/// Format a timestamp for storage.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the fixed-width layout and plain RFC 3339.
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
