// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./velio.toml` > `~/.config/velio/velio.toml` > `/etc/velio/velio.toml`
//! with environment variable overrides via `VELIO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VelioConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/velio/velio.toml` (system-wide)
/// 3. `~/.config/velio/velio.toml` (user XDG config)
/// 4. `./velio.toml` (local directory)
/// 5. `VELIO_*` environment variables
pub fn load_config() -> Result<VelioConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VelioConfig::default()))
        .merge(Toml::file("/etc/velio/velio.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("velio/velio.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("velio.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<VelioConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VelioConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VelioConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VelioConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `VELIO_GATEWAY_BEARER_TOKEN` must map to
/// `gateway.bearer_token`, not `gateway.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("VELIO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: VELIO_ASSISTANT_API_KEY -> "assistant_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("assistant_", "assistant.", 1)
            .replacen("typing_", "typing.", 1)
            .replacen("detection_", "detection.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("whatsapp_", "whatsapp.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_applies_overrides_over_defaults() {
        let config = load_config_from_str(
            r#"
            [agent]
            name = "lot-assistant"

            [assistant]
            enabled = true
            keywords = ["price", "hello"]
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.name, "lot-assistant");
        assert!(config.assistant.enabled);
        assert_eq!(config.assistant.keywords, vec!["price", "hello"]);
        // Untouched sections keep their defaults.
        assert_eq!(config.typing.words_per_minute, 40);
    }

    #[test]
    fn load_from_str_rejects_unknown_section_key() {
        let result = load_config_from_str("[assistant]\nrespond_too_all = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "velio");
    }
}
