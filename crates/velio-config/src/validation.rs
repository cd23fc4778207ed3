// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, coherent delay bounds, and
//! non-empty keyword lists.

use crate::diagnostic::ConfigError;
use crate::model::VelioConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VelioConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_bind_host(&config.gateway.host, "gateway.host", &mut errors);
    validate_bind_host(&config.whatsapp.webhook_host, "whatsapp.webhook_host", &mut errors);

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.typing.min_delay_ms > config.typing.max_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "typing.min_delay_ms ({}) must not exceed typing.max_delay_ms ({})",
                config.typing.min_delay_ms, config.typing.max_delay_ms
            ),
        });
    }

    if config.typing.words_per_minute == 0 {
        errors.push(ConfigError::Validation {
            message: "typing.words_per_minute must be positive".to_string(),
        });
    }

    if config.assistant.max_history == 0 {
        errors.push(ConfigError::Validation {
            message: "assistant.max_history must be at least 1".to_string(),
        });
    }

    if config.assistant.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "assistant.timeout_secs must be positive".to_string(),
        });
    }

    // An enabled assistant that never triggers is a misconfiguration.
    if config.assistant.enabled
        && !config.assistant.respond_to_all
        && config.assistant.keywords.iter().all(|k| k.trim().is_empty())
    {
        errors.push(ConfigError::Validation {
            message: "assistant.keywords must contain at least one non-empty keyword \
                      when respond_to_all is disabled"
                .to_string(),
        });
    }

    for (i, keyword) in config.detection.unavailability_keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("detection.unavailability_keywords[{i}] must not be empty"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_bind_host(host: &str, key: &str, errors: &mut Vec<ConfigError>) {
    let addr = host.trim();
    if addr.is_empty() {
        errors.push(ConfigError::Validation {
            message: format!("{key} must not be empty"),
        });
        return;
    }

    let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = addr
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
    if !is_valid_ip && !is_valid_hostname {
        errors.push(ConfigError::Validation {
            message: format!("{key} `{addr}` is not a valid IP address or hostname"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = VelioConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn inverted_delay_bounds_are_rejected() {
        let mut config = VelioConfig::default();
        config.typing.min_delay_ms = 20_000;
        config.typing.max_delay_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("min_delay_ms"))
        );
    }

    #[test]
    fn zero_words_per_minute_is_rejected() {
        let mut config = VelioConfig::default();
        config.typing.words_per_minute = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn enabled_assistant_without_triggers_is_rejected() {
        let mut config = VelioConfig::default();
        config.assistant.enabled = true;
        config.assistant.respond_to_all = false;
        config.assistant.keywords = vec!["".to_string(), "  ".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("keywords")));
    }

    #[test]
    fn empty_unavailability_keyword_is_rejected() {
        let mut config = VelioConfig::default();
        config.detection.unavailability_keywords.push(" ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn invalid_gateway_host_is_rejected() {
        let mut config = VelioConfig::default();
        config.gateway.host = "not a host!".to_string();
        assert!(validate_config(&config).is_err());
    }
}
