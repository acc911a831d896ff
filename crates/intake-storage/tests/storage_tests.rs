// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests driving `SqliteStorage` through the core traits.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use intake_config::model::StorageConfig;
use intake_core::{
    DialogueState, LoggedMessage, MessageDirection, MessageLog, PluginAdapter, SessionStore,
};
use intake_storage::SqliteStorage;
use tempfile::tempdir;

async fn storage(dir: &tempfile::TempDir) -> Arc<SqliteStorage> {
    let path = dir.path().join("intake.db");
    let storage = SqliteStorage::new(StorageConfig {
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    Arc::new(storage)
}

#[tokio::test]
async fn thirty_day_eviction_keeps_recent_sessions() {
    let dir = tempdir().unwrap();
    let sqlite = storage(&dir).await;
    let store: Arc<dyn SessionStore> = sqlite.clone();

    let now = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();
    store
        .get_or_create_session("+5511000000031", "oi", now - Duration::days(31))
        .await
        .unwrap();
    store
        .get_or_create_session("+5511000000029", "oi", now - Duration::days(29))
        .await
        .unwrap();

    let deleted = store
        .delete_inactive_since(now - Duration::days(30), now)
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert!(store.get_session("+5511000000031").await.unwrap().is_none());
    assert!(store.get_session("+5511000000029").await.unwrap().is_some());

    sqlite.shutdown().await.unwrap();
}

#[tokio::test]
async fn session_survives_reopen() {
    let dir = tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();
    {
        let sqlite = storage(&dir).await;
        let mut s = sqlite
            .get_or_create_session("+5511", "oi", now)
            .await
            .unwrap();
        s.dialogue_state = DialogueState::Option1Details;
        s.collected_fields.insert("name".into(), "Maria".into());
        s.collected_fields.insert("energyConsumption".into(), "500 kWh".into());
        s.pending_field = Some("panelPreference".into());
        sqlite.save_session(&s).await.unwrap();
        sqlite.shutdown().await.unwrap();
    }

    let sqlite = storage(&dir).await;
    let s = sqlite.get_session("+5511").await.unwrap().unwrap();
    assert_eq!(s.dialogue_state, DialogueState::Option1Details);
    assert_eq!(s.field("energyConsumption"), Some("500 kWh"));
    assert_eq!(s.pending_field.as_deref(), Some("panelPreference"));
}

#[tokio::test]
async fn message_log_through_trait_object() {
    let dir = tempdir().unwrap();
    let sqlite = storage(&dir).await;
    let log: Arc<dyn MessageLog> = sqlite.clone();
    let now = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();

    for (i, direction) in [
        MessageDirection::Inbound,
        MessageDirection::Bot,
        MessageDirection::Operator,
    ]
    .into_iter()
    .enumerate()
    {
        log.append_message(&LoggedMessage {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: "+5511".into(),
            direction,
            body: format!("msg {i}"),
            created_at: now + Duration::seconds(i as i64),
        })
        .await
        .unwrap();
    }

    let history = log.get_history("+5511", None).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].direction, MessageDirection::Inbound);
    assert_eq!(history[2].direction, MessageDirection::Operator);
    assert_eq!(history[2].body, "msg 2");

    let last = log.get_history("+5511", Some(1)).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].body, "msg 2");

    assert!(log.get_history("+other", None).await.unwrap().is_empty());
}
