// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Intake dialogue engine.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use intake_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Cool-down: {}s", config.exclusion.cooldown_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::IntakeConfig;

/// Load configuration from the layered search path and validate it.
pub fn load_and_validate() -> Result<IntakeConfig, Vec<ConfigError>> {
    checked(loader::load_config(), searched_sources)
}

/// Load configuration from a single file (plus `INTAKE_*` overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<IntakeConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<IntakeConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Render the effective configuration as TOML, with the bearer tokens masked.
pub fn render_effective(config: &IntakeConfig) -> Result<String, ConfigError> {
    let mut masked = config.clone();
    for token in [
        &mut masked.gateway.bearer_token,
        &mut masked.bridge.outbound_token,
    ] {
        if token.is_some() {
            *token = Some("[REDACTED]".to_string());
        }
    }
    toml::to_string_pretty(&masked).map_err(|e| ConfigError::Other(e.to_string()))
}

/// Validate a loaded config, or turn the load failure into diagnostics.
///
/// `sources` is only read on failure, to attach spans.
fn checked(
    loaded: Result<IntakeConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<IntakeConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let shown = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Some((shown.display().to_string(), content))
}

fn searched_sources() -> Vec<(String, String)> {
    let user = dirs::config_dir().map(|d| d.join("intake/intake.toml"));
    [
        Some(PathBuf::from("/etc/intake/intake.toml")),
        user,
        Some(PathBuf::from("intake.toml")),
    ]
    .into_iter()
    .flatten()
    .filter_map(|p| read_source(&p))
    .collect()
}
