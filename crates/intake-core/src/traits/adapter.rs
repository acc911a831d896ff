// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle trait shared by the channel and storage adapters.

use async_trait::async_trait;

use crate::error::IntakeError;
use crate::types::HealthStatus;

/// An adapter the gateway can probe for `/health` and the binary can shut down.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Component name shown in health reports.
    fn name(&self) -> &str;

    /// Probe the backing resource. An `Err` counts as unhealthy.
    async fn health_check(&self) -> Result<HealthStatus, IntakeError>;

    /// Release held resources.
    async fn shutdown(&self) -> Result<(), IntakeError>;
}
