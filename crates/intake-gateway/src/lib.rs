// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Intake dialogue engine.
//!
//! Exposes the operator API over axum and hosts the ingress side of the
//! [`BridgeChannel`] adapter, which connects the engine to a messaging
//! transport running as a separate bridge process.

pub mod auth;
pub mod bridge;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use bridge::{BridgeChannel, BridgeEvent, BridgeIngress, normalize_contact, to_chat_id};
pub use server::{GatewayState, ServerConfig, build_router, start_server};
