// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end engine tests over the mock transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use intake_core::{ChannelAdapter, ChannelStatus, DialogueState, IntakeError, MessageDirection, Session};
use intake_engine::dialogue::BRANCHES;
use intake_engine::exclusion::Exclusion;
use intake_engine::{BOT_MARKER, DropReason, HandleOutcome, MaintenanceKind, templates};
use intake_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;

const MARIA: &str = "+5511999990001";
const JOAO: &str = "+5511999990002";

async fn harness() -> Arc<TestHarness> {
    Arc::new(TestHarness::builder().build().await.unwrap())
}

async fn instant_harness() -> TestHarness {
    TestHarness::builder().with_pacing_ms(0).build().await.unwrap()
}

/// Walk a contact to the main menu with `name`.
async fn to_menu(h: &TestHarness, contact: &str, name: &str) {
    h.send(contact, "oi").await;
    h.send(contact, name).await;
    h.channel.clear_sent().await;
}

#[tokio::test(start_paused = true)]
async fn new_contact_gets_welcome_then_paced_name_prompt() {
    let h = harness().await;

    let task = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.send(MARIA, "Hi").await })
    };

    tokio::time::sleep(Duration::from_millis(1_999)).await;
    let early = h.replies(MARIA).await;
    assert_eq!(early.len(), 1);
    assert_eq!(early[0], templates::welcome());
    assert_eq!(
        h.session(MARIA).await.unwrap().dialogue_state,
        DialogueState::WaitingName
    );

    assert_eq!(task.await.unwrap(), HandleOutcome::Processed);
    let all = h.replies(MARIA).await;
    assert_eq!(all, vec![templates::welcome(), templates::name_request()]);

    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.first_message, "Hi");
    assert!(h.engine.guard().is_empty());
}

#[tokio::test(start_paused = true)]
async fn name_capture_personalizes_menu() {
    let h = harness().await;
    h.send(MARIA, "Hi").await;
    h.channel.clear_sent().await;

    assert_eq!(h.send(MARIA, "  Maria ").await, HandleOutcome::Processed);

    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::WaitingOption);
    assert_eq!(session.field("name"), Some("Maria"));
    let replies = h.replies(MARIA).await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Olá, Maria!"));
}

#[tokio::test]
async fn option_one_completes_with_summary_and_cooldown() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;

    h.send(MARIA, "1").await;
    assert_eq!(h.replies(MARIA).await, vec![templates::branch_opening(1)]);
    assert_eq!(
        h.session(MARIA).await.unwrap().dialogue_state,
        DialogueState::Option1Details
    );

    h.send(MARIA, "5000 kWh").await;
    h.send(MARIA, "sem preferência").await;

    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::Completed);
    assert_eq!(session.field("energyConsumption"), Some("5000 kWh"));
    assert_eq!(session.field("panelPreference"), Some("sem preferência"));
    assert_eq!(session.mute_until, Some(h.now() + ChronoDuration::minutes(5)));

    let replies = h.replies(MARIA).await;
    let n = replies.len();
    assert!(replies[n - 2].contains("Resumo das informações de Maria"));
    assert!(replies[n - 2].contains("5000 kWh"));
    assert_eq!(replies[n - 1], templates::thank_you());
}

#[tokio::test]
async fn every_branch_walks_exactly_its_fields() {
    let h = instant_harness().await;
    for branch in BRANCHES {
        let contact = format!("+55119000000{}", branch.option);
        to_menu(&h, &contact, "Ana").await;
        h.send(&contact, &branch.option.to_string()).await;
        for field in branch.fields {
            assert_eq!(h.send(&contact, &format!("{field}-answer")).await, HandleOutcome::Processed);
        }

        let session = h.session(&contact).await.unwrap();
        assert_eq!(session.dialogue_state, DialogueState::Completed);
        for field in branch.fields {
            assert_eq!(session.field(field), Some(format!("{field}-answer").as_str()));
        }
        // name + selectedOption + branch fields
        assert_eq!(session.collected_fields.len(), branch.fields.len() + 2);
        assert_eq!(session.mute_until, Some(h.now() + ChronoDuration::seconds(300)));
    }
}

#[tokio::test]
async fn stop_opts_out_and_silences_everything() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;

    assert_eq!(h.send(MARIA, "STOP").await, HandleOutcome::Processed);
    assert_eq!(h.replies(MARIA).await, vec![templates::opt_out_ack()]);
    let before = h.session(MARIA).await.unwrap();
    assert_eq!(before.blocked_until, Some(h.now() + ChronoDuration::days(365)));

    for text in ["oi", "1", "menu", "stop"] {
        assert_eq!(
            h.send(MARIA, text).await,
            HandleOutcome::Dropped(DropReason::OptedOut)
        );
    }

    let after = h.session(MARIA).await.unwrap();
    assert_eq!(after.dialogue_state, before.dialogue_state);
    assert_eq!(after.collected_fields, before.collected_fields);
    assert_eq!(h.replies(MARIA).await.len(), 1);

    // Dropped events are still logged.
    let history = h.engine.get_conversation_history(MARIA, None).await.unwrap();
    let inbound = history
        .iter()
        .filter(|m| m.direction == MessageDirection::Inbound)
        .count();
    assert_eq!(inbound, 2 + 1 + 4);
}

#[tokio::test]
async fn menu_can_bypass_opt_out_when_configured() {
    let h = TestHarness::builder()
        .with_pacing_ms(0)
        .with_menu_bypassing_opt_out()
        .build()
        .await
        .unwrap();
    to_menu(&h, MARIA, "Maria").await;
    h.send(MARIA, "stop").await;

    assert_eq!(h.send(MARIA, "menu").await, HandleOutcome::Processed);
    let session = h.session(MARIA).await.unwrap();
    assert!(session.blocked_until.is_none());
    assert_eq!(session.dialogue_state, DialogueState::WaitingOption);
}

#[tokio::test]
async fn opt_out_expires() {
    let h = instant_harness().await;
    h.send(MARIA, "stop").await;
    h.clock.advance(ChronoDuration::days(365));

    assert_eq!(h.send(MARIA, "oi").await, HandleOutcome::Processed);
    let session = h.session(MARIA).await.unwrap();
    assert!(session.blocked_until.is_none());
    assert_eq!(session.dialogue_state, DialogueState::WaitingName);
}

#[tokio::test(start_paused = true)]
async fn concurrent_events_for_one_contact_coalesce() {
    let h = harness().await;

    let (a, b) = tokio::join!(h.send(MARIA, "Hi"), h.send(MARIA, "Hi again"));
    let mut outcomes = [a, b];
    outcomes.sort_by_key(|o| matches!(o, HandleOutcome::Coalesced));
    assert_eq!(outcomes, [HandleOutcome::Processed, HandleOutcome::Coalesced]);

    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::WaitingName);
    assert_eq!(h.replies(MARIA).await.len(), 2);
    assert!(h.engine.guard().is_empty());
}

#[tokio::test(start_paused = true)]
async fn different_contacts_overlap() {
    let h = harness().await;
    let start = tokio::time::Instant::now();
    let (a, b) = tokio::join!(h.send(MARIA, "Hi"), h.send(JOAO, "Olá"));
    assert_eq!(a, HandleOutcome::Processed);
    assert_eq!(b, HandleOutcome::Processed);
    // Both pacing delays ran concurrently.
    assert!(start.elapsed() < Duration::from_millis(4_000));
}

#[tokio::test]
async fn cooldown_drops_then_self_heals() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    h.send(MARIA, "1").await;
    h.send(MARIA, "200 kWh").await;
    h.send(MARIA, "nenhuma").await;
    h.channel.clear_sent().await;

    h.clock.advance(ChronoDuration::seconds(299));
    assert_eq!(
        h.send(MARIA, "oi").await,
        HandleOutcome::Dropped(DropReason::CoolingDown)
    );
    assert!(h.replies(MARIA).await.is_empty());

    h.clock.advance(ChronoDuration::seconds(1));
    assert_eq!(h.send(MARIA, "oi").await, HandleOutcome::Processed);
    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::WaitingName);
    assert!(session.mute_until.is_none());
    assert!(session.collected_fields.is_empty());
    assert_eq!(h.replies(MARIA).await[0], templates::welcome());
}

#[tokio::test]
async fn menu_overrides_cooldown_and_keeps_name() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    h.send(MARIA, "4").await;
    h.send(MARIA, "R$ 30 mil").await;
    h.send(MARIA, "banco").await;
    h.send(MARIA, "sim").await;
    h.channel.clear_sent().await;
    assert!(h.session(MARIA).await.unwrap().mute_until.is_some());

    assert_eq!(h.send(MARIA, " Menu ").await, HandleOutcome::Processed);
    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::WaitingOption);
    assert!(session.mute_until.is_none());
    assert_eq!(session.collected_fields.len(), 1);
    assert_eq!(session.field("name"), Some("Maria"));
    assert!(h.replies(MARIA).await[0].starts_with("Olá, Maria!"));
}

#[tokio::test]
async fn menu_mid_branch_drops_branch_data() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    h.send(MARIA, "2").await;
    h.send(MARIA, "80 metros").await;

    h.send(MARIA, "menu").await;
    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::WaitingOption);
    assert!(session.field("wellDepth").is_none());
    assert!(session.pending_field.is_none());
}

#[tokio::test]
async fn invalid_option_reprompts() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    h.send(MARIA, "9").await;
    assert_eq!(h.replies(MARIA).await, vec![templates::invalid_option()]);
    assert_eq!(
        h.session(MARIA).await.unwrap().dialogue_state,
        DialogueState::WaitingOption
    );
}

#[tokio::test]
async fn forwarded_contacts_get_no_automated_replies() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    h.send(MARIA, "6").await;
    assert_eq!(h.replies(MARIA).await, vec![templates::forwarded_to_human()]);

    assert_eq!(
        h.send(MARIA, "alguém aí?").await,
        HandleOutcome::Dropped(DropReason::ForwardedToHuman)
    );
    assert_eq!(h.replies(MARIA).await.len(), 1);
}

#[tokio::test]
async fn operator_reply_mutes_for_a_day() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;

    assert!(h.operator_types(MARIA, "Oi Maria, aqui é a Ana!").await.unwrap());
    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.mute_until, Some(h.now() + ChronoDuration::hours(24)));

    assert_eq!(
        h.send(MARIA, "oi Ana").await,
        HandleOutcome::Dropped(DropReason::CoolingDown)
    );
    assert!(h.replies(MARIA).await.is_empty());
}

#[tokio::test]
async fn operator_reply_to_unseen_contact_creates_session() {
    let h = instant_harness().await;
    assert!(h.operator_types(JOAO, "Bom dia!").await.unwrap());
    let session = h.session(JOAO).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::Initial);
    assert!(session.is_muted_at(h.now()));
}

#[tokio::test]
async fn tagged_echo_is_not_a_takeover() {
    let h = instant_harness().await;
    let echo = format!("{}{BOT_MARKER}", templates::welcome());
    assert!(!h.operator_types(JOAO, &echo).await.unwrap());
    assert!(h.session(JOAO).await.is_none());
}

#[tokio::test]
async fn quoted_bot_text_is_still_a_takeover() {
    let h = instant_harness().await;
    let typed = format!(
        "{}{BOT_MARKER}\n\nAna aqui, já vi seu pedido!",
        templates::thank_you()
    );
    assert!(h.operator_types(JOAO, &typed).await.unwrap());
    let session = h.session(JOAO).await.unwrap();
    assert_eq!(session.mute_until, Some(h.now() + ChronoDuration::hours(24)));
}

#[tokio::test]
async fn bot_sends_carry_the_marker() {
    let h = instant_harness().await;
    h.send(MARIA, "oi").await;
    for sent in h.channel.sent_messages().await {
        assert!(sent.text.ends_with(BOT_MARKER));
    }
}

#[tokio::test]
async fn persistence_failure_sends_one_apology() {
    let h = instant_harness().await;
    h.memory.as_ref().unwrap().fail_writes(true);

    assert_eq!(h.send(MARIA, "oi").await, HandleOutcome::Failed);
    assert_eq!(h.replies(MARIA).await, vec![templates::apology()]);
    assert!(h.engine.guard().is_empty());

    h.memory.as_ref().unwrap().fail_writes(false);
    assert_eq!(h.send(MARIA, "oi").await, HandleOutcome::Processed);
}

#[tokio::test]
async fn send_failure_still_advances_state() {
    let h = instant_harness().await;
    h.channel.set_status(ChannelStatus::Connecting);

    assert_eq!(h.send(MARIA, "oi").await, HandleOutcome::Processed);
    assert_eq!(h.channel.sent_count().await, 0);
    assert_eq!(
        h.session(MARIA).await.unwrap().dialogue_state,
        DialogueState::WaitingName
    );

    h.channel.set_status(ChannelStatus::Ready);
    h.channel.fail_sends(true);
    assert_eq!(h.send(MARIA, "Maria").await, HandleOutcome::Processed);
    assert_eq!(
        h.session(MARIA).await.unwrap().dialogue_state,
        DialogueState::WaitingOption
    );
}

#[tokio::test]
async fn group_messages_are_ignored() {
    let h = instant_harness().await;
    let outcome = h
        .engine
        .handle_inbound(&intake_core::InboundEvent {
            sender_id: MARIA.into(),
            text: "oi".into(),
            is_group: true,
        })
        .await;
    assert_eq!(outcome, HandleOutcome::GroupIgnored);
    assert!(h.session(MARIA).await.is_none());
}

#[tokio::test]
async fn operator_mutations_respect_the_guard() {
    let h = instant_harness().await;
    h.send(MARIA, "oi").await;

    let permit = h.engine.guard().try_acquire(MARIA).unwrap();
    let err = h.engine.reset_conversation(MARIA).await.unwrap_err();
    assert!(matches!(err, IntakeError::ContactBusy { .. }));
    assert!(matches!(
        h.engine.unblock_contact(MARIA).await.unwrap_err(),
        IntakeError::ContactBusy { .. }
    ));
    drop(permit);

    let session = h.engine.reset_conversation(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::Initial);

    assert!(matches!(
        h.engine.reset_conversation(JOAO).await.unwrap_err(),
        IntakeError::NotFound { .. }
    ));
}

#[tokio::test]
async fn reset_keeps_opt_out_and_unblock_lifts_it() {
    let h = instant_harness().await;
    h.send(MARIA, "stop").await;

    let reset = h.engine.reset_conversation(MARIA).await.unwrap();
    assert!(reset.is_blocked_at(h.now()));

    let excluded = h.engine.list_excluded().await.unwrap();
    assert_eq!(excluded.len(), 1);
    assert!(matches!(excluded[0].exclusion, Exclusion::OptedOut(_)));

    let unblocked = h.engine.unblock_contact(MARIA).await.unwrap();
    assert!(unblocked.blocked_until.is_none());
    assert!(h.engine.list_excluded().await.unwrap().is_empty());
    assert_eq!(h.send(MARIA, "oi").await, HandleOutcome::Processed);
}

#[tokio::test]
async fn forward_to_human_by_operator() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;

    let session = h.engine.forward_to_human(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::ForwardedToHuman);
    assert_eq!(h.replies(MARIA).await, vec![templates::forwarded_to_human()]);
}

#[tokio::test]
async fn custom_message_bypasses_exclusion() {
    let h = instant_harness().await;
    h.send(MARIA, "stop").await;
    h.channel.clear_sent().await;

    assert!(h.engine.send_custom_message(MARIA, "Olá, tudo bem?").await);
    let sent = h.channel.sent_to(MARIA).await;
    assert_eq!(sent, vec![format!("Olá, tudo bem?{BOT_MARKER}")]);

    let history = h.engine.get_conversation_history(MARIA, Some(1)).await.unwrap();
    assert_eq!(history[0].direction, MessageDirection::Operator);
    assert_eq!(history[0].body, "Olá, tudo bem?");
}

#[tokio::test]
async fn conversation_queries() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    h.clock.advance(ChronoDuration::seconds(10));
    h.send(JOAO, "oi").await;

    let list = h.engine.list_conversations().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].contact_id, JOAO);
    assert_eq!(list[1].name.as_deref(), Some("Maria"));

    let state = h.engine.get_conversation_state(MARIA).await.unwrap();
    assert_eq!(state.session.dialogue_state, DialogueState::WaitingOption);
    assert_eq!(state.exclusion, Exclusion::None);
    assert!(!state.in_flight);

    assert!(matches!(
        h.engine.get_conversation_state("+000").await.unwrap_err(),
        IntakeError::NotFound { .. }
    ));
}

#[tokio::test]
async fn maintenance_trigger_evicts_stale_sessions() {
    let h = instant_harness().await;
    let memory = h.memory.as_ref().unwrap();
    memory
        .put(Session::new("+stale", "oi", h.now() - ChronoDuration::days(31)))
        .await;
    memory
        .put(Session::new("+recent", "oi", h.now() - ChronoDuration::days(29)))
        .await;

    let report = h.engine.trigger_maintenance_now().await.unwrap();
    assert_eq!(report.kind, MaintenanceKind::Eviction);
    assert_eq!(report.affected, 1);
    assert!(h.session("+stale").await.is_none());
    assert!(h.session("+recent").await.is_some());
}

#[tokio::test]
async fn nightly_reset_spares_opted_out_contacts() {
    let h = instant_harness().await;
    to_menu(&h, MARIA, "Maria").await;
    to_menu(&h, JOAO, "João").await;
    h.send(JOAO, "stop").await;

    let report = h.engine.maintenance().run_nightly_reset_now().await.unwrap();
    assert_eq!(report.kind, MaintenanceKind::NightlyReset);
    assert_eq!(report.affected, 1);

    let maria = h.session(MARIA).await.unwrap();
    assert_eq!(maria.dialogue_state, DialogueState::Initial);
    assert!(maria.collected_fields.is_empty());
    let joao = h.session(JOAO).await.unwrap();
    assert_eq!(joao.dialogue_state, DialogueState::WaitingOption);
    assert!(joao.is_blocked_at(h.now()));
}

#[tokio::test(start_paused = true)]
async fn scheduler_waits_for_ready_transport() {
    let h = harness().await;
    h.channel.set_status(ChannelStatus::PairingRequired {
        code: "2@pairing".into(),
    });
    h.memory
        .as_ref()
        .unwrap()
        .put(Session::new("+stale", "oi", h.now() - ChronoDuration::days(45)))
        .await;

    let cancel = CancellationToken::new();
    let task = {
        let h = Arc::clone(&h);
        let status = h.channel.status();
        let cancel = cancel.clone();
        tokio::spawn(async move { h.engine.maintenance().run(status, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.session("+stale").await.is_some());

    h.channel.set_status(ChannelStatus::Ready);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.session("+stale").await.is_none());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn run_loop_processes_events_until_channel_closes() {
    let h = instant_harness().await;
    h.channel.inject_text(MARIA, "oi").await;
    h.channel.inject_text(JOAO, "olá").await;
    h.channel.close();

    h.engine.run(CancellationToken::new()).await.unwrap();

    for _ in 0..100 {
        if h.replies(MARIA).await.len() == 2 && h.replies(JOAO).await.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.replies(MARIA).await.len(), 2);
    assert_eq!(h.replies(JOAO).await.len(), 2);
}

#[tokio::test]
async fn run_loop_stops_on_cancel() {
    let h = instant_harness().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    h.engine.run(cancel).await.unwrap();
}

#[tokio::test]
async fn full_flow_on_sqlite() {
    let h = TestHarness::builder()
        .with_pacing_ms(0)
        .with_sqlite()
        .build()
        .await
        .unwrap();

    h.send(MARIA, "oi").await;
    h.send(MARIA, "Maria").await;
    h.send(MARIA, "5").await;
    h.send(MARIA, "inversor desligado").await;
    h.send(MARIA, "E-301").await;
    h.send(MARIA, "sim").await;

    let session = h.session(MARIA).await.unwrap();
    assert_eq!(session.dialogue_state, DialogueState::Completed);
    assert_eq!(session.field("errorMessage"), Some("E-301"));
    assert!(session.is_muted_at(h.now()));

    let history = h.engine.get_conversation_history(MARIA, None).await.unwrap();
    assert!(history.iter().any(|m| m.direction == MessageDirection::Bot));
    assert!(history.iter().all(|m| !m.body.contains(BOT_MARKER)));
}
