// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `SessionStore` and `MessageLog` with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use intake_core::{DialogueState, IntakeError, LoggedMessage, MessageLog, Session, SessionStore};

/// A map-backed store mirroring the SQLite semantics.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, Session>>,
    messages: Mutex<Vec<LoggedMessage>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make session reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make session writes fail. Reads keep working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert or replace a session as-is, bypassing the activity rule.
    pub async fn put(&self, session: Session) {
        self.sessions
            .lock()
            .await
            .insert(session.contact_id.clone(), session);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn check_read(&self) -> Result<(), IntakeError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), IntakeError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        Ok(())
    }
}

fn injected(op: &str) -> IntakeError {
    IntakeError::Storage {
        source: format!("injected {op} failure").into(),
    }
}

fn is_pristine(s: &Session) -> bool {
    s.dialogue_state == DialogueState::Initial
        && s.pending_field.is_none()
        && s.collected_fields.is_empty()
        && s.mute_until.is_none()
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self, contact_id: &str) -> Result<Option<Session>, IntakeError> {
        self.check_read()?;
        Ok(self.sessions.lock().await.get(contact_id).cloned())
    }

    async fn get_or_create_session(
        &self,
        contact_id: &str,
        first_message: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, IntakeError> {
        self.check_read()?;
        self.check_write()?;
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(contact_id.to_string())
            .and_modify(|s| s.touch(now))
            .or_insert_with(|| Session::new(contact_id, first_message, now));
        Ok(session.clone())
    }

    async fn save_session(&self, session: &Session) -> Result<(), IntakeError> {
        self.check_write()?;
        let mut sessions = self.sessions.lock().await;
        let mut next = session.clone();
        if let Some(existing) = sessions.get(&session.contact_id) {
            next.touch(existing.last_activity_at);
        }
        sessions.insert(next.contact_id.clone(), next);
        Ok(())
    }

    async fn touch_session(&self, contact_id: &str, now: DateTime<Utc>) -> Result<(), IntakeError> {
        self.check_write()?;
        if let Some(s) = self.sessions.lock().await.get_mut(contact_id) {
            s.touch(now);
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, IntakeError> {
        self.check_read()?;
        let mut all: Vec<Session> = self.sessions.lock().await.values().cloned().collect();
        all.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(all)
    }

    async fn delete_session(&self, contact_id: &str) -> Result<bool, IntakeError> {
        self.check_write()?;
        Ok(self.sessions.lock().await.remove(contact_id).is_some())
    }

    async fn delete_inactive_since(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, IntakeError> {
        self.check_write()?;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity_at >= cutoff || s.is_blocked_at(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn reset_all_except_blocked(&self, now: DateTime<Utc>) -> Result<u64, IntakeError> {
        self.check_write()?;
        let mut reset = 0;
        for s in self.sessions.lock().await.values_mut() {
            if s.is_blocked_at(now) || is_pristine(s) {
                continue;
            }
            s.reset_dialogue();
            reset += 1;
        }
        Ok(reset)
    }
}

#[async_trait]
impl MessageLog for MemoryStore {
    async fn append_message(&self, message: &LoggedMessage) -> Result<(), IntakeError> {
        self.check_write()?;
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn get_history(
        &self,
        contact_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<LoggedMessage>, IntakeError> {
        self.check_read()?;
        let matching: Vec<LoggedMessage> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| m.contact_id == contact_id)
            .cloned()
            .collect();
        let skip = match limit {
            Some(n) if n >= 0 => matching.len().saturating_sub(n as usize),
            _ => 0,
        };
        Ok(matching.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn save_keeps_activity_monotonic() {
        let store = MemoryStore::new();
        let mut s = store.get_or_create_session("+5511", "oi", t0()).await.unwrap();
        store.touch_session("+5511", t0() + Duration::minutes(5)).await.unwrap();

        s.dialogue_state = DialogueState::WaitingName;
        store.save_session(&s).await.unwrap();

        let stored = store.get_session("+5511").await.unwrap().unwrap();
        assert_eq!(stored.dialogue_state, DialogueState::WaitingName);
        assert_eq!(stored.last_activity_at, t0() + Duration::minutes(5));
    }

    #[tokio::test]
    async fn eviction_and_reset_spare_blocked_contacts() {
        let store = MemoryStore::new();
        let old = t0() - Duration::days(40);
        let mut blocked = Session::new("+blocked", "stop", old);
        blocked.blocked_until = Some(t0() + Duration::days(300));
        blocked.dialogue_state = DialogueState::WaitingOption;
        store.put(blocked).await;
        store.put(Session::new("+stale", "oi", old)).await;
        let mut active = Session::new("+active", "oi", t0());
        active.dialogue_state = DialogueState::Option1Details;
        store.put(active).await;

        assert_eq!(store.delete_inactive_since(t0() - Duration::days(30), t0()).await.unwrap(), 1);
        assert_eq!(store.reset_all_except_blocked(t0()).await.unwrap(), 1);

        let blocked = store.get_session("+blocked").await.unwrap().unwrap();
        assert_eq!(blocked.dialogue_state, DialogueState::WaitingOption);
        let active = store.get_session("+active").await.unwrap().unwrap();
        assert_eq!(active.dialogue_state, DialogueState::Initial);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        assert!(store.get_or_create_session("+5511", "oi", t0()).await.is_err());
        store.fail_writes(false);
        store.fail_reads(true);
        assert!(store.get_session("+5511").await.is_err());
    }

    #[tokio::test]
    async fn history_limit_keeps_latest() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .append_message(&LoggedMessage {
                    id: uuid::Uuid::new_v4().to_string(),
                    contact_id: "+5511".into(),
                    direction: intake_core::MessageDirection::Inbound,
                    body: format!("m{i}"),
                    created_at: t0(),
                })
                .await
                .unwrap();
        }
        let last = store.get_history("+5511", Some(2)).await.unwrap();
        assert_eq!(last.iter().map(|m| m.body.as_str()).collect::<Vec<_>>(), ["m1", "m2"]);
    }
}
