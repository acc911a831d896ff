// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Intake dialogue engine.

use thiserror::Error;

/// The primary error type used across all Intake adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (transport not ready, send rejected, closed stream).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No session exists for the requested contact.
    #[error("no session for contact {contact}")]
    NotFound { contact: String },

    /// Another event for the same contact is currently being processed.
    #[error("contact {contact} is busy")]
    ContactBusy { contact: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Shorthand for a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        IntakeError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the error means the transport stream has ended for good.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, IntakeError::Channel { message, .. } if message.contains("closed"))
    }
}
