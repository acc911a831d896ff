// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Intake dialogue engine.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by the engine, the storage backend, the gateway and the channel
//! adapters.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use error::IntakeError;
pub use types::{
    ChannelEvent, ChannelStatus, DialogueState, HealthStatus, InboundEvent, LoggedMessage,
    MessageDirection, OwnMessage, Session,
};

pub use traits::{ChannelAdapter, MessageLog, PluginAdapter, SessionStore};
