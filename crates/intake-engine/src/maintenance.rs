// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stale-session eviction and the nightly reset.
//!
//! Both loops start once the transport first reports ready and stop on
//! cancellation. The nightly reset sleeps until the next local midnight,
//! runs, then recomputes the delay, so DST changes never drift it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use intake_config::model::MaintenanceConfig;
use intake_core::{ChannelStatus, Clock, IntakeError, SessionStore};

/// Which maintenance job produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Eviction,
    NightlyReset,
}

/// Outcome of one maintenance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub kind: MaintenanceKind,
    /// Sessions deleted or reset.
    pub affected: u64,
    pub ran_at: DateTime<Utc>,
}

/// Runs the periodic housekeeping jobs against the session store.
pub struct MaintenanceScheduler {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: MaintenanceConfig,
}

impl MaintenanceScheduler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Delete sessions idle for longer than the configured age.
    ///
    /// Contacts with an open opt-out are kept.
    pub async fn run_eviction_now(&self) -> Result<MaintenanceReport, IntakeError> {
        let now = self.clock.now();
        let max_age = chrono::Duration::days(
            i64::try_from(self.config.session_max_age_days).unwrap_or(i64::MAX / 86_400_000),
        );
        let cutoff = now - max_age;
        let deleted = self.store.delete_inactive_since(cutoff, now).await?;
        info!(deleted, cutoff = %cutoff, "stale session eviction complete");
        Ok(MaintenanceReport {
            kind: MaintenanceKind::Eviction,
            affected: deleted,
            ran_at: now,
        })
    }

    /// Reset every session to `INITIAL` except currently opted-out contacts.
    pub async fn run_nightly_reset_now(&self) -> Result<MaintenanceReport, IntakeError> {
        let now = self.clock.now();
        let reset = self.store.reset_all_except_blocked(now).await?;
        info!(reset, "nightly session reset complete");
        Ok(MaintenanceReport {
            kind: MaintenanceKind::NightlyReset,
            affected: reset,
            ran_at: now,
        })
    }

    /// Wait for the transport to become ready, then run both loops until `cancel` fires.
    pub async fn run(&self, mut status: watch::Receiver<ChannelStatus>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            ready = async { status.wait_for(ChannelStatus::is_ready).await.is_ok() } => {
                if !ready {
                    debug!("status channel closed before transport was ready");
                    return;
                }
            }
        }

        info!(
            eviction_interval_secs = self.config.eviction_interval_secs,
            nightly_reset = self.config.nightly_reset,
            "maintenance scheduler started"
        );
        tokio::join!(self.eviction_loop(&cancel), self.nightly_loop(&cancel));
        info!("maintenance scheduler stopped");
    }

    async fn eviction_loop(&self, cancel: &CancellationToken) {
        let period = Duration::from_secs(self.config.eviction_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_eviction_now().await {
                        error!(error = %e, "stale session eviction failed");
                    }
                }
            }
        }
    }

    async fn nightly_loop(&self, cancel: &CancellationToken) {
        if !self.config.nightly_reset {
            return;
        }

        let mut last_target: Option<DateTime<Utc>> = None;
        loop {
            let now = self.clock.now();
            // A timer firing slightly early must not schedule the same midnight twice.
            let from = match last_target {
                Some(prev) if prev >= now => prev + chrono::Duration::seconds(1),
                _ => now,
            };
            let target = next_local_midnight(from, &chrono::Local);
            let delay = (target - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next_reset = %target, delay_secs = delay.as_secs(), "nightly reset scheduled");

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {
                    last_target = Some(target);
                    if let Err(e) = self.run_nightly_reset_now().await {
                        error!(error = %e, "nightly session reset failed");
                    }
                }
            }
        }
    }
}

/// The first local midnight strictly after `now` in `tz`.
///
/// An ambiguous midnight resolves to its earliest instant; a midnight that
/// falls in a DST gap resolves to the first valid local instant after it.
pub fn next_local_midnight<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    let Some(midnight) = local_date
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return now + chrono::Duration::days(1);
    };

    earliest_valid(midnight, |naive| {
        tz.from_local_datetime(naive).map(|dt| dt.with_timezone(&Utc))
    })
    .unwrap_or_else(|| now + chrono::Duration::days(1))
}

/// Resolve `naive` to a UTC instant, stepping forward minute by minute
/// through a gap. Gives up after a day.
fn earliest_valid<F>(naive: NaiveDateTime, resolve: F) -> Option<DateTime<Utc>>
where
    F: Fn(&NaiveDateTime) -> LocalResult<DateTime<Utc>>,
{
    let mut candidate = naive;
    for _ in 0..=(24 * 60) {
        match resolve(&candidate) {
            LocalResult::Single(t) => return Some(t),
            LocalResult::Ambiguous(earliest, latest) => return Some(earliest.min(latest)),
            LocalResult::None => candidate += chrono::Duration::minutes(1),
        }
    }
    None
}
