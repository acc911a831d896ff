// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./intake.toml` > `~/.config/intake/intake.toml` > `/etc/intake/intake.toml`
//! with environment variable overrides via `INTAKE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::IntakeConfig;

/// Sections recognized by the environment mapping, in match order.
const ENV_SECTIONS: &[&str] = &[
    "bot",
    "engine",
    "exclusion",
    "maintenance",
    "storage",
    "gateway",
    "bridge",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/intake/intake.toml` (system-wide)
/// 3. `~/.config/intake/intake.toml` (user XDG config)
/// 4. `./intake.toml` (local directory)
/// 5. `INTAKE_*` environment variables
pub fn load_config() -> Result<IntakeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<IntakeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IntakeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<IntakeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IntakeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(IntakeConfig::default()))
        .merge(Toml::file("/etc/intake/intake.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("intake/intake.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("intake.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `exclusion_cooldown_secs` maps to `exclusion.cooldown_secs`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("INTAKE_").map(|key| map_env_key(key.as_str()).into())
}
