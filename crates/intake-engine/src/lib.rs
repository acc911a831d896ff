// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational session engine for the Intake dialogue bot.
//!
//! The [`Engine`] is the central coordinator that:
//! - Receives events from a channel adapter
//! - Serializes processing per contact with the [`InFlightGuard`]
//! - Applies opt-out, cool-down and manual-takeover windows
//! - Advances the scripted dialogue and sends its replies
//! - Runs the maintenance scheduler once the transport is ready

pub mod dialogue;
pub mod dispatcher;
pub mod exclusion;
pub mod guard;
pub mod maintenance;
pub mod operator;
pub mod shutdown;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use intake_config::model::IntakeConfig;
use intake_core::{
    ChannelAdapter, ChannelEvent, ChannelStatus, Clock, DialogueState, InboundEvent,
    IntakeError, LoggedMessage, MessageDirection, MessageLog, OwnMessage, SessionStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dialogue::{Command, Outbound};
use crate::exclusion::Exclusion;

pub use crate::dispatcher::{BOT_MARKER, Dispatcher, is_bot_tagged};
pub use crate::exclusion::{ExcludedContact, ExclusionManager};
pub use crate::guard::{InFlightGuard, InFlightPermit};
pub use crate::maintenance::{MaintenanceKind, MaintenanceReport, MaintenanceScheduler};
pub use crate::operator::{ConversationState, ConversationSummary};

/// How long shutdown waits for in-flight steps.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Why an inbound event produced no dialogue step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    OptedOut,
    CoolingDown,
    ForwardedToHuman,
}

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The event ran a step (dialogue advance or command).
    Processed,
    /// Another event for the same contact was in flight.
    Coalesced,
    /// Group chat traffic is never processed.
    GroupIgnored,
    Dropped(DropReason),
    /// The step failed and the apology was sent.
    Failed,
}

/// The conversational session engine. Cloning shares state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    channel: Arc<dyn ChannelAdapter>,
    store: Arc<dyn SessionStore>,
    log: Arc<dyn MessageLog>,
    clock: Arc<dyn Clock>,
    dispatcher: Dispatcher,
    exclusion: ExclusionManager,
    guard: InFlightGuard,
    maintenance: Arc<MaintenanceScheduler>,
    pacing: Duration,
}

impl Engine {
    /// Creates an engine over the given adapters.
    pub fn new(
        config: &IntakeConfig,
        channel: Arc<dyn ChannelAdapter>,
        store: Arc<dyn SessionStore>,
        log: Arc<dyn MessageLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&channel),
            Arc::clone(&store),
            Arc::clone(&log),
            Arc::clone(&clock),
        );
        let maintenance = Arc::new(MaintenanceScheduler::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.maintenance.clone(),
        ));

        info!(
            bot_name = config.bot.name.as_str(),
            channel = channel.name(),
            "engine initialized"
        );

        Self {
            inner: Arc::new(EngineInner {
                channel,
                store,
                log,
                clock,
                dispatcher,
                exclusion: ExclusionManager::from_config(&config.exclusion),
                guard: InFlightGuard::new(),
                maintenance,
                pacing: Duration::from_millis(config.engine.pacing_delay_ms),
            }),
        }
    }

    pub fn guard(&self) -> &InFlightGuard {
        &self.inner.guard
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn maintenance(&self) -> &MaintenanceScheduler {
        &self.inner.maintenance
    }

    /// The transport adapter the engine sends through.
    pub fn channel(&self) -> Arc<dyn ChannelAdapter> {
        Arc::clone(&self.inner.channel)
    }

    /// Current transport status, including any pairing code.
    pub fn channel_status(&self) -> ChannelStatus {
        self.inner.channel.status().borrow().clone()
    }

    /// Runs the engine until `cancel` fires or the channel closes.
    ///
    /// Each event is handled on its own task so different contacts overlap.
    /// On exit the maintenance scheduler is stopped and in-flight steps are
    /// drained.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), IntakeError> {
        self.inner.channel.connect().await?;

        let maintenance_cancel = cancel.child_token();
        let maintenance = {
            let scheduler = Arc::clone(&self.inner.maintenance);
            let status = self.inner.channel.status();
            let token = maintenance_cancel.clone();
            tokio::spawn(async move { scheduler.run(status, token).await })
        };

        info!("engine running");
        loop {
            tokio::select! {
                event = self.inner.channel.receive() => {
                    match event {
                        Ok(event) => {
                            let engine = self.clone();
                            tokio::spawn(async move { engine.handle_event(event).await });
                        }
                        Err(e) if e.is_channel_closed() => {
                            info!("channel closed, stopping engine");
                            break;
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping engine");
                    break;
                }
            }
        }

        maintenance_cancel.cancel();
        if let Err(e) = maintenance.await {
            warn!(error = %e, "maintenance task ended abnormally");
        }
        shutdown::drain_in_flight(&self.inner.guard, DRAIN_TIMEOUT).await;

        info!("engine stopped");
        Ok(())
    }

    /// Routes a single channel event.
    pub async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Inbound(inbound) => {
                self.handle_inbound(&inbound).await;
            }
            ChannelEvent::OwnMessage(own) => {
                if let Err(e) = self.handle_own_message(&own).await {
                    error!(contact = %own.recipient_id, error = %e, "failed to record operator takeover");
                }
            }
        }
    }

    /// Processes one inbound text from a contact.
    ///
    /// Never returns an error: step failures are logged and answered with
    /// the generic apology.
    pub async fn handle_inbound(&self, event: &InboundEvent) -> HandleOutcome {
        if event.is_group {
            debug!(sender = %event.sender_id, "group message ignored");
            return HandleOutcome::GroupIgnored;
        }

        let contact = event.sender_id.as_str();
        self.record(contact, MessageDirection::Inbound, &event.text)
            .await;

        let Some(_permit) = self.inner.guard.try_acquire(contact) else {
            debug!(contact = %contact, "contact already in flight, event coalesced");
            return HandleOutcome::Coalesced;
        };

        match self.step(contact, &event.text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(contact = %contact, error = %e, "inbound step failed");
                if !self
                    .inner
                    .dispatcher
                    .send(contact, &templates::apology())
                    .await
                {
                    warn!(contact = %contact, "apology not delivered");
                }
                HandleOutcome::Failed
            }
        }
    }

    async fn step(&self, contact: &str, text: &str) -> Result<HandleOutcome, IntakeError> {
        let inner = &self.inner;
        let now = inner.clock.now();
        let mut session = inner.store.get_or_create_session(contact, text, now).await?;
        let eval = inner.exclusion.evaluate(&mut session, now);

        match Command::parse(text) {
            Some(Command::Stop) => {
                if let Exclusion::OptedOut(_) = eval.exclusion {
                    debug!(contact = %contact, "stop from opted-out contact ignored");
                    return Ok(HandleOutcome::Dropped(DropReason::OptedOut));
                }
                inner.exclusion.opt_out(&mut session, now);
                inner.store.save_session(&session).await?;
                info!(contact = %contact, until = ?session.blocked_until, "contact opted out");
                self.deliver(contact, vec![Outbound::now(templates::opt_out_ack())])
                    .await;
                return Ok(HandleOutcome::Processed);
            }
            Some(Command::Menu) if inner.exclusion.menu_allowed(eval.exclusion) => {
                inner.exclusion.clear_for_menu(&mut session);
                let step = dialogue::return_to_menu(&mut session);
                inner.store.save_session(&session).await?;
                debug!(contact = %contact, "returned to main menu");
                self.deliver(contact, step.replies).await;
                return Ok(HandleOutcome::Processed);
            }
            _ => {}
        }

        let dropped = match eval.exclusion {
            Exclusion::OptedOut(_) => Some(DropReason::OptedOut),
            Exclusion::CoolingDown(_) => Some(DropReason::CoolingDown),
            Exclusion::None if session.dialogue_state == DialogueState::ForwardedToHuman => {
                Some(DropReason::ForwardedToHuman)
            }
            Exclusion::None => None,
        };
        if let Some(reason) = dropped {
            if eval.expired {
                inner.store.save_session(&session).await?;
            }
            debug!(contact = %contact, reason = ?reason, "event dropped");
            return Ok(HandleOutcome::Dropped(reason));
        }

        let from = session.dialogue_state;
        let step = dialogue::advance(&mut session, text);
        if step.completed {
            inner.exclusion.start_cooldown(&mut session, now);
        }
        inner.store.save_session(&session).await?;
        debug!(
            contact = %contact,
            from = %from,
            to = %session.dialogue_state,
            "dialogue advanced"
        );
        if step.completed {
            info!(
                contact = %contact,
                option = session.field(dialogue::SELECTED_OPTION_FIELD).unwrap_or(""),
                "intake completed"
            );
        }

        self.deliver(contact, step.replies).await;
        Ok(HandleOutcome::Processed)
    }

    /// Sends replies in order, waiting the pacing delay before paced ones.
    async fn deliver(&self, contact: &str, replies: Vec<Outbound>) {
        for reply in replies {
            if reply.paced && !self.inner.pacing.is_zero() {
                tokio::time::sleep(self.inner.pacing).await;
            }
            if !self.inner.dispatcher.send(contact, &reply.text).await {
                warn!(contact = %contact, "reply not delivered");
            }
        }
    }

    /// Handles a message sent from the bot's own account.
    ///
    /// Untagged messages are a human operator taking over: automation for
    /// the recipient is muted for the manual-takeover window. Returns true
    /// when a takeover was recorded.
    pub async fn handle_own_message(&self, message: &OwnMessage) -> Result<bool, IntakeError> {
        if is_bot_tagged(&message.text) {
            return Ok(false);
        }

        let inner = &self.inner;
        let contact = message.recipient_id.as_str();
        self.record(contact, MessageDirection::Operator, &message.text)
            .await;

        let _permit = inner.guard.acquire(contact).await;
        let now = inner.clock.now();
        let mut session = inner
            .store
            .get_or_create_session(contact, &message.text, now)
            .await?;
        inner.exclusion.manual_takeover(&mut session, now);
        inner.store.save_session(&session).await?;

        info!(contact = %contact, until = ?session.mute_until, "operator reply detected, automation muted");
        Ok(true)
    }

    /// Best-effort message log append.
    async fn record(&self, contact: &str, direction: MessageDirection, body: &str) {
        let entry = LoggedMessage {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: contact.to_string(),
            direction,
            body: body.to_string(),
            created_at: self.inner.clock.now(),
        };
        if let Err(e) = self.inner.log.append_message(&entry).await {
            debug!(contact = %contact, error = %e, "message log append failed");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("in_flight", &self.inner.guard.len())
            .field("pacing", &self.inner.pacing)
            .finish_non_exhaustive()
    }
}
