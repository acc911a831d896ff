// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opt-out, cool-down and manual-takeover windows.
//!
//! Windows live on the [`Session`] record. Reads are lazy-expiring: an
//! evaluation that finds a window elapsed clears it and reports that the
//! record changed so the caller can persist it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use intake_config::model::ExclusionConfig;
use intake_core::Session;

/// Why automated replies to a contact are currently suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "until", rename_all = "snake_case")]
pub enum Exclusion {
    None,
    OptedOut(DateTime<Utc>),
    CoolingDown(DateTime<Utc>),
}

impl Exclusion {
    pub fn is_excluded(&self) -> bool {
        !matches!(self, Exclusion::None)
    }
}

/// Outcome of [`ExclusionManager::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub exclusion: Exclusion,
    /// A lapsed window was cleared from the session.
    pub expired: bool,
}

/// A currently excluded contact, as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedContact {
    pub contact_id: String,
    pub exclusion: Exclusion,
    pub remaining_secs: i64,
}

/// Applies the configured exclusion windows to sessions.
#[derive(Debug, Clone)]
pub struct ExclusionManager {
    cooldown: Duration,
    opt_out: Duration,
    manual_takeover: Duration,
    menu_bypasses_opt_out: bool,
}

impl ExclusionManager {
    pub fn from_config(config: &ExclusionConfig) -> Self {
        Self {
            cooldown: secs(config.cooldown_secs),
            opt_out: Duration::days(i64::try_from(config.opt_out_days).unwrap_or(i64::MAX / 86_400_000)),
            manual_takeover: secs(config.manual_takeover_secs),
            menu_bypasses_opt_out: config.menu_bypasses_opt_out,
        }
    }

    /// Check the session's windows at `now`, clearing any that have lapsed.
    ///
    /// Opt-out takes precedence over cool-down.
    pub fn evaluate(&self, session: &mut Session, now: DateTime<Utc>) -> Evaluation {
        let mut expired = false;

        if let Some(until) = session.blocked_until {
            if until > now {
                return Evaluation {
                    exclusion: Exclusion::OptedOut(until),
                    expired: false,
                };
            }
            session.blocked_until = None;
            expired = true;
        }

        if let Some(until) = session.mute_until {
            if until > now {
                return Evaluation {
                    exclusion: Exclusion::CoolingDown(until),
                    expired,
                };
            }
            session.mute_until = None;
            expired = true;
        }

        Evaluation {
            exclusion: Exclusion::None,
            expired,
        }
    }

    /// Read-only view of the session's windows at `now`.
    pub fn peek(&self, session: &Session, now: DateTime<Utc>) -> Exclusion {
        match (session.blocked_until, session.mute_until) {
            (Some(until), _) if until > now => Exclusion::OptedOut(until),
            (_, Some(until)) if until > now => Exclusion::CoolingDown(until),
            _ => Exclusion::None,
        }
    }

    /// Whether a "menu" command may proceed given the current evaluation.
    pub fn menu_allowed(&self, exclusion: Exclusion) -> bool {
        match exclusion {
            Exclusion::OptedOut(_) => self.menu_bypasses_opt_out,
            Exclusion::CoolingDown(_) | Exclusion::None => true,
        }
    }

    /// Prepare a session for the "menu" command.
    pub fn clear_for_menu(&self, session: &mut Session) {
        session.mute_until = None;
        if self.menu_bypasses_opt_out {
            session.blocked_until = None;
        }
    }

    /// Opt the contact out of automated messages.
    pub fn opt_out(&self, session: &mut Session, now: DateTime<Utc>) {
        session.blocked_until = Some(now + self.opt_out);
    }

    /// Start the post-completion cool-down.
    pub fn start_cooldown(&self, session: &mut Session, now: DateTime<Utc>) {
        session.mute_until = Some(now + self.cooldown);
    }

    /// Defer to a human operator who replied from the bot's account.
    ///
    /// Never shortens a longer mute that is already running.
    pub fn manual_takeover(&self, session: &mut Session, now: DateTime<Utc>) {
        let until = now + self.manual_takeover;
        if session.mute_until.is_none_or(|current| current < until) {
            session.mute_until = Some(until);
        }
    }

    /// Lift every window.
    pub fn lift(&self, session: &mut Session) {
        session.blocked_until = None;
        session.mute_until = None;
    }

    /// Report the contact if it is currently excluded.
    pub fn excluded_entry(&self, session: &Session, now: DateTime<Utc>) -> Option<ExcludedContact> {
        let exclusion = self.peek(session, now);
        let until = match exclusion {
            Exclusion::OptedOut(until) | Exclusion::CoolingDown(until) => until,
            Exclusion::None => return None,
        };
        Some(ExcludedContact {
            contact_id: session.contact_id.clone(),
            exclusion,
            remaining_secs: (until - now).num_seconds(),
        })
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1_000))
}
