// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Velio sales assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Velio configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VelioConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Automated-reply assistant settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Human-like typing delay settings for automated replies.
    #[serde(default)]
    pub typing: TypingConfig,

    /// Price-offer and unavailability detection settings.
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp transport settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "velio".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Automated-reply assistant configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Master switch for automated replies.
    #[serde(default)]
    pub enabled: bool,

    /// Reply to every inbound message instead of keyword-triggered ones.
    #[serde(default)]
    pub respond_to_all: bool,

    /// Trigger keywords matched case-insensitively as substrings.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// System prompt handed to the provider.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum history turns supplied to the provider per reply.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Reply sent when the provider fails; `None` means stay silent.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: Option<String>,

    /// Provider API key. `None` disables the assistant regardless of `enabled`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible chat-completions base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Provider request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            respond_to_all: false,
            keywords: default_keywords(),
            system_prompt: default_system_prompt(),
            max_history: default_max_history(),
            fallback_reply: default_fallback_reply(),
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    [
        "assistance",
        "aide",
        "info",
        "bonjour",
        "salut",
        "prix",
        "véhicule",
        "voiture",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_system_prompt() -> String {
    "Tu es l'assistant de vente d'un vendeur automobile. Réponds brièvement, \
     poliment et en français aux questions sur le véhicule en vente."
        .to_string()
}

fn default_max_history() -> usize {
    15
}

fn default_fallback_reply() -> Option<String> {
    Some(
        "Désolé, je n'ai pas pu traiter votre demande pour le moment. \
         Un conseiller humain vous répondra bientôt."
            .to_string(),
    )
}

fn default_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model() -> String {
    "grok-3-mini".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

/// Typing-delay configuration for automated replies.
///
/// The delay is derived from reply length and a words-per-minute rate,
/// clamped to `[min_delay_ms, max_delay_ms]`, optionally jittered by up to
/// +30%. Demo conversations always reply instantly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TypingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,

    /// Add up to +30% random jitter to the computed delay.
    #[serde(default = "default_true")]
    pub randomize: bool,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            words_per_minute: default_words_per_minute(),
            randomize: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    15000
}

fn default_words_per_minute() -> u32 {
    40
}

/// Price-offer and unavailability detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionConfig {
    /// Pause the assistant (active -> negotiation) when a price offer is
    /// detected.
    #[serde(default = "default_true")]
    pub pause_on_price_offer: bool,

    /// Phrases marking the listing as unavailable/sold, matched whole-word,
    /// accent- and case-insensitively.
    #[serde(default = "default_unavailability_keywords")]
    pub unavailability_keywords: Vec<String>,

    /// Contact identifiers whose conversations are sandbox/demo: state
    /// transitions and reply delays are suppressed.
    #[serde(default)]
    pub demo_numbers: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            pause_on_price_offer: true,
            unavailability_keywords: default_unavailability_keywords(),
            demo_numbers: Vec::new(),
        }
    }
}

fn default_unavailability_keywords() -> Vec<String> {
    [
        "pas dispo",
        "non dispo",
        "n'est pas disponible",
        "n'est plus disponible",
        "plus dispo",
        "déjà vendu",
        "vendu",
        "il est vendu",
        "elle est vendue",
        "je l'ai vendu",
        "plus à vendre",
        "n'est plus à vendre",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "velio.db".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*` routes. `None` leaves the API open
    /// (local deployments only).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// WhatsApp transport configuration.
///
/// The transport speaks to a WhatsApp bridge: outbound messages go to
/// `api_url`, inbound events arrive on the webhook listener and are
/// authenticated with an HMAC-SHA256 signature over the raw body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Base URL of the bridge's HTTP API. `None` disables the transport.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token for the bridge API.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Shared secret for webhook signature verification.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Webhook listener bind host.
    #[serde(default = "default_webhook_host")]
    pub webhook_host: String,

    /// Webhook listener bind port.
    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            webhook_secret: None,
            webhook_host: default_webhook_host(),
            webhook_port: default_webhook_port(),
        }
    }
}

fn default_webhook_host() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_port() -> u16 {
    3100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = VelioConfig::default();
        assert_eq!(config.agent.name, "velio");
        assert_eq!(config.agent.log_level, "info");
        assert!(!config.assistant.enabled);
        assert!(!config.assistant.respond_to_all);
        assert!(config.assistant.keywords.contains(&"prix".to_string()));
        assert_eq!(config.assistant.max_history, 15);
        assert!(config.detection.pause_on_price_offer);
        assert!(
            config
                .detection
                .unavailability_keywords
                .contains(&"vendu".to_string())
        );
        assert_eq!(config.typing.min_delay_ms, 2000);
        assert_eq!(config.typing.max_delay_ms, 15000);
        assert_eq!(config.typing.words_per_minute, 40);
        assert_eq!(config.gateway.port, 3000);
        assert!(config.whatsapp.api_url.is_none());
    }

    #[test]
    fn config_serializes_and_deserializes() {
        let config = VelioConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: VelioConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agent.name, config.agent.name);
        assert_eq!(parsed.typing.max_delay_ms, config.typing.max_delay_ms);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<VelioConfig, _> = toml::from_str("[agent]\nnaem = \"typo\"\n");
        assert!(result.is_err());
    }
}
