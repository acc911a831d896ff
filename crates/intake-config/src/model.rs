// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Intake dialogue engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Intake configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Dialogue pacing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Opt-out, cool-down and manual takeover windows.
    #[serde(default)]
    pub exclusion: ExclusionConfig,

    /// Stale-session eviction and nightly reset.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging transport bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and the status endpoint.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "intake".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Dialogue pacing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Delay between a reply and the follow-up prompt, in milliseconds.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: default_pacing_delay_ms(),
        }
    }
}

fn default_pacing_delay_ms() -> u64 {
    2000
}

/// Exclusion window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionConfig {
    /// Cool-down after a completed branch, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Opt-out duration after "stop", in days.
    #[serde(default = "default_opt_out_days")]
    pub opt_out_days: u64,

    /// Mute applied when a human operator replies from the bot's account, in seconds.
    #[serde(default = "default_manual_takeover_secs")]
    pub manual_takeover_secs: u64,

    /// Whether "menu" also lifts an active opt-out.
    #[serde(default)]
    pub menu_bypasses_opt_out: bool,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            opt_out_days: default_opt_out_days(),
            manual_takeover_secs: default_manual_takeover_secs(),
            menu_bypasses_opt_out: false,
        }
    }
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_opt_out_days() -> u64 {
    365
}

fn default_manual_takeover_secs() -> u64 {
    86_400
}

/// Maintenance scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// Period of the stale-session eviction sweep, in seconds.
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,

    /// Sessions idle for longer than this many days are evicted.
    #[serde(default = "default_session_max_age_days")]
    pub session_max_age_days: u64,

    /// Reset every non-blocked session at local midnight.
    #[serde(default = "default_nightly_reset")]
    pub nightly_reset: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            eviction_interval_secs: default_eviction_interval_secs(),
            session_max_age_days: default_session_max_age_days(),
            nightly_reset: default_nightly_reset(),
        }
    }
}

fn default_eviction_interval_secs() -> u64 {
    86_400
}

fn default_session_max_age_days() -> u64 {
    30
}

fn default_nightly_reset() -> bool {
    true
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("intake").join("intake.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("intake.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Enable the HTTP gateway.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/api` and `/bridge` routes.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Messaging transport bridge configuration.
///
/// The bridge is a sidecar that owns the transport session. It posts events
/// to the gateway and accepts outbound sends at `outbound_url`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// URL the bridge accepts outbound sends on. `None` disables sending.
    #[serde(default)]
    pub outbound_url: Option<String>,

    /// Bearer token presented to the bridge on outbound sends.
    #[serde(default)]
    pub outbound_token: Option<String>,

    /// Timeout for a single outbound send, in seconds.
    #[serde(default = "default_bridge_timeout_secs")]
    pub timeout_secs: u64,

    /// Capacity of the inbound event queue.
    #[serde(default = "default_bridge_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            outbound_url: None,
            outbound_token: None,
            timeout_secs: default_bridge_timeout_secs(),
            queue_capacity: default_bridge_queue_capacity(),
        }
    }
}

fn default_bridge_timeout_secs() -> u64 {
    10
}

fn default_bridge_queue_capacity() -> usize {
    256
}
