// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock source for exclusion windows and activity timestamps.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock instant.
///
/// Exclusion windows, activity bookkeeping and the maintenance cutoffs all
/// read time through this trait so tests can substitute a manual clock.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
