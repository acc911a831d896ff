// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles an [`Engine`] over a [`MockChannel`], a
//! [`ManualClock`] and either the in-memory store or a temp SQLite database.

use std::sync::Arc;

use intake_config::model::{IntakeConfig, StorageConfig};
use intake_core::{
    Clock, InboundEvent, IntakeError, MessageLog, OwnMessage, Session, SessionStore,
};
use intake_engine::{BOT_MARKER, Engine, HandleOutcome};
use intake_storage::SqliteStorage;

use crate::clock::ManualClock;
use crate::memory_store::MemoryStore;
use crate::mock_channel::MockChannel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: IntakeConfig,
    sqlite: bool,
    clock: Option<Arc<ManualClock>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = IntakeConfig::default();
        config.gateway.enabled = false;
        Self {
            config,
            sqlite: false,
            clock: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: IntakeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pacing_ms(mut self, ms: u64) -> Self {
        self.config.engine.pacing_delay_ms = ms;
        self
    }

    pub fn with_menu_bypassing_opt_out(mut self) -> Self {
        self.config.exclusion.menu_bypasses_opt_out = true;
        self
    }

    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Back the engine with a temp SQLite database instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, IntakeError> {
        let clock = self.clock.unwrap_or_default();
        let channel = Arc::new(MockChannel::new());

        let store: Arc<dyn SessionStore>;
        let log: Arc<dyn MessageLog>;
        let mut memory = None;
        let mut temp_dir = None;
        if self.sqlite {
            let dir =
                tempfile::TempDir::new().map_err(|e| IntakeError::Storage { source: e.into() })?;
            let storage = SqliteStorage::new(StorageConfig {
                database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
                wal_mode: true,
            });
            storage.initialize().await?;
            let storage = Arc::new(storage);
            store = storage.clone();
            log = storage;
            temp_dir = Some(dir);
        } else {
            let mem = Arc::new(MemoryStore::new());
            store = mem.clone();
            log = mem.clone();
            memory = Some(mem);
        }

        let engine = Engine::new(
            &self.config,
            channel.clone(),
            Arc::clone(&store),
            Arc::clone(&log),
            clock.clone(),
        );

        Ok(TestHarness {
            engine,
            channel,
            store,
            log,
            memory,
            clock,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and a manual clock.
pub struct TestHarness {
    pub engine: Engine,
    pub channel: Arc<MockChannel>,
    pub store: Arc<dyn SessionStore>,
    pub log: Arc<dyn MessageLog>,
    /// Set when the harness runs on the in-memory store.
    pub memory: Option<Arc<MemoryStore>>,
    pub clock: Arc<ManualClock>,
    pub config: IntakeConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Deliver a direct-chat text from `contact` through the engine.
    pub async fn send(&self, contact: &str, text: &str) -> HandleOutcome {
        self.engine
            .handle_inbound(&InboundEvent {
                sender_id: contact.to_string(),
                text: text.to_string(),
                is_group: false,
            })
            .await
    }

    /// Simulate a human typing `text` to `contact` from the bot's account.
    pub async fn operator_types(&self, contact: &str, text: &str) -> Result<bool, IntakeError> {
        self.engine
            .handle_own_message(&OwnMessage {
                recipient_id: contact.to_string(),
                text: text.to_string(),
            })
            .await
    }

    /// Texts sent to `contact`, with the bot marker stripped.
    pub async fn replies(&self, contact: &str) -> Vec<String> {
        self.channel
            .sent_to(contact)
            .await
            .into_iter()
            .map(|t| t.trim_end_matches(BOT_MARKER).to_string())
            .collect()
    }

    pub async fn session(&self, contact: &str) -> Option<Session> {
        self.store.get_session(contact).await.ok().flatten()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
