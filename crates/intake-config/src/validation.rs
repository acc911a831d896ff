// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::IntakeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first one.
pub fn validate_config(config: &IntakeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bot.log_level `{}` must be one of: {}",
                config.bot.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.exclusion.cooldown_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "exclusion.cooldown_secs must be greater than 0".to_string(),
        });
    }

    if config.exclusion.opt_out_days == 0 {
        errors.push(ConfigError::Validation {
            message: "exclusion.opt_out_days must be greater than 0".to_string(),
        });
    }

    if config.exclusion.manual_takeover_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "exclusion.manual_takeover_secs must be greater than 0".to_string(),
        });
    }

    if config.maintenance.eviction_interval_secs < 60 {
        errors.push(ConfigError::Validation {
            message: format!(
                "maintenance.eviction_interval_secs must be at least 60, got {}",
                config.maintenance.eviction_interval_secs
            ),
        });
    }

    if config.maintenance.session_max_age_days == 0 {
        errors.push(ConfigError::Validation {
            message: "maintenance.session_max_age_days must be greater than 0".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gateway.enabled {
        let host = config.gateway.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }

        if config
            .gateway
            .bearer_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            errors.push(ConfigError::Validation {
                message: "gateway.bearer_token must not be blank when set".to_string(),
            });
        }
    }

    if let Some(url) = &config.bridge.outbound_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("bridge.outbound_url `{url}` must be an http(s) URL"),
        });
    }

    if config.bridge.queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "bridge.queue_capacity must be greater than 0".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&IntakeConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = IntakeConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn zero_windows_fail_validation() {
        let mut config = IntakeConfig::default();
        config.exclusion.cooldown_secs = 0;
        config.exclusion.opt_out_days = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "cooldown_secs"));
        assert!(has_message(&errors, "opt_out_days"));
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let mut config = IntakeConfig::default();
        config.bot.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "bot.log_level"));
    }

    #[test]
    fn bad_gateway_host_only_checked_when_enabled() {
        let mut config = IntakeConfig::default();
        config.gateway.host = "not a host!".to_string();
        assert!(validate_config(&config).is_err());

        config.gateway.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bridge_url_must_be_http() {
        let mut config = IntakeConfig::default();
        config.bridge.outbound_url = Some("ftp://bridge".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "bridge.outbound_url"));

        config.bridge.outbound_url = Some("http://127.0.0.1:8085/send".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
