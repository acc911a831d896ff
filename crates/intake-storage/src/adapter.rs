// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the session store and message log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use intake_config::model::StorageConfig;
use intake_core::{
    HealthStatus, IntakeError, LoggedMessage, MessageLog, PluginAdapter, Session, SessionStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the query modules. The
/// database is opened by [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`SqliteStorage::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), IntakeError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| IntakeError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, IntakeError> {
        self.db.get().ok_or_else(|| IntakeError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, IntakeError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), IntakeError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn get_session(&self, contact_id: &str) -> Result<Option<Session>, IntakeError> {
        queries::sessions::get_session(self.db()?, contact_id).await
    }

    async fn get_or_create_session(
        &self,
        contact_id: &str,
        first_message: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, IntakeError> {
        queries::sessions::get_or_create_session(self.db()?, contact_id, first_message, now).await
    }

    async fn save_session(&self, session: &Session) -> Result<(), IntakeError> {
        queries::sessions::save_session(self.db()?, session).await
    }

    async fn touch_session(&self, contact_id: &str, now: DateTime<Utc>) -> Result<(), IntakeError> {
        queries::sessions::touch_session(self.db()?, contact_id, now).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, IntakeError> {
        queries::sessions::list_sessions(self.db()?).await
    }

    async fn delete_session(&self, contact_id: &str) -> Result<bool, IntakeError> {
        queries::sessions::delete_session(self.db()?, contact_id).await
    }

    async fn delete_inactive_since(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, IntakeError> {
        queries::sessions::delete_inactive_since(self.db()?, cutoff, now).await
    }

    async fn reset_all_except_blocked(&self, now: DateTime<Utc>) -> Result<u64, IntakeError> {
        queries::sessions::reset_all_except_blocked(self.db()?, now).await
    }
}

#[async_trait]
impl MessageLog for SqliteStorage {
    async fn append_message(&self, message: &LoggedMessage) -> Result<(), IntakeError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_history(
        &self,
        contact_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<LoggedMessage>, IntakeError> {
        queries::messages::get_messages_for_contact(self.db()?, contact_id, limit).await
    }
}
