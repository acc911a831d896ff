// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `intake sweep` command implementation.
//!
//! Runs one maintenance job directly against the database, without a
//! transport. Useful from cron when the bot itself is stopped.

use std::sync::Arc;

use tracing::warn;

use intake_config::IntakeConfig;
use intake_core::{IntakeError, PluginAdapter, SystemClock};
use intake_engine::{MaintenanceReport, MaintenanceScheduler};
use intake_storage::SqliteStorage;

pub async fn run_sweep(
    config: &IntakeConfig,
    nightly: bool,
) -> Result<MaintenanceReport, IntakeError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let scheduler = MaintenanceScheduler::new(
        storage.clone(),
        Arc::new(SystemClock),
        config.maintenance.clone(),
    );
    let report = if nightly {
        scheduler.run_nightly_reset_now().await
    } else {
        scheduler.run_eviction_now().await
    };

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }
    report
}
