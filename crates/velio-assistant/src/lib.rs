// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant adapter backed by an OpenAI-compatible chat-completions API.
//!
//! The pipeline supplies bounded conversation history; this adapter turns
//! it into a completion request with the configured system prompt. Provider
//! failures degrade to the configured fallback reply (the chat counterpart
//! never sees an internal error), or to an error -- and therefore silence --
//! when no fallback is configured.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use velio_config::SettingsHandle;
use velio_config::model::AssistantConfig;
use velio_core::types::{ChatRole, ChatTurn};
use velio_core::{AdapterType, AssistantAdapter, HealthStatus, PluginAdapter, VelioError};

use client::{ApiMessage, ChatClient};

/// Assistant adapter speaking the `/chat/completions` wire shape.
pub struct HttpAssistant {
    client: ChatClient,
    settings: SettingsHandle,
    fallback_reply: Option<String>,
}

impl HttpAssistant {
    /// Creates the adapter from the assistant section of the configuration.
    ///
    /// Requires `config.api_key` to be set; the runtime system prompt is
    /// read from `settings` on every request so gateway updates apply
    /// immediately.
    pub fn new(config: &AssistantConfig, settings: SettingsHandle) -> Result<Self, VelioError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| VelioError::Config("assistant.api_key is required".into()))?;

        let client = ChatClient::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            config.max_tokens,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self {
            client,
            settings,
            fallback_reply: config.fallback_reply.clone(),
        })
    }

    fn build_messages(&self, history: &[ChatTurn], message: &str) -> Vec<ApiMessage> {
        let settings = self.settings.current();
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ApiMessage {
            role: "system",
            content: settings.system_prompt.clone(),
        });
        for turn in history {
            messages.push(ApiMessage {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: turn.content.clone(),
            });
        }
        messages.push(ApiMessage {
            role: "user",
            content: message.to_string(),
        });
        messages
    }
}

#[async_trait]
impl PluginAdapter for HttpAssistant {
    fn name(&self) -> &str {
        "chat-completions"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    async fn health_check(&self) -> Result<HealthStatus, VelioError> {
        // The provider is only exercised on demand; configuration presence
        // is the health signal here.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VelioError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for HttpAssistant {
    async fn generate_reply(
        &self,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, VelioError> {
        let messages = self.build_messages(history, message);

        match self.client.complete(&messages).await {
            Ok(reply) => Ok(reply),
            Err(e) => match &self.fallback_reply {
                Some(fallback) => {
                    warn!(error = %e, "provider failed, returning fallback reply");
                    Ok(fallback.clone())
                }
                None => Err(e),
            },
        }
    }
}

/// Assistant used when no provider API key is configured.
///
/// The auto-respond policy already returns false for a disabled assistant;
/// this adapter exists so the pipeline always has an assistant to hold, and
/// turns any unexpected call into a clean error (silence for the
/// counterpart).
pub struct SilentAssistant;

#[async_trait]
impl PluginAdapter for SilentAssistant {
    fn name(&self) -> &str {
        "silent"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    async fn health_check(&self) -> Result<HealthStatus, VelioError> {
        Ok(HealthStatus::Degraded("no provider configured".to_string()))
    }

    async fn shutdown(&self) -> Result<(), VelioError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for SilentAssistant {
    async fn generate_reply(
        &self,
        _history: &[ChatTurn],
        _message: &str,
    ) -> Result<String, VelioError> {
        Err(VelioError::Assistant {
            message: "assistant provider not configured".to_string(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velio_config::VelioConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server_url: &str, fallback: Option<&str>) -> AssistantConfig {
        let mut config = VelioConfig::default().assistant;
        config.enabled = true;
        config.api_key = Some("test-key".to_string());
        config.base_url = server_url.to_string();
        config.fallback_reply = fallback.map(String::from);
        config
    }

    fn settings() -> SettingsHandle {
        SettingsHandle::from_config(&VelioConfig::default())
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn generate_reply_returns_completion_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Bonjour !")))
            .expect(1)
            .mount(&server)
            .await;

        let assistant =
            HttpAssistant::new(&config_for(&server.uri(), None), settings()).unwrap();
        let reply = assistant.generate_reply(&[], "bonjour").await.unwrap();
        assert_eq!(reply, "Bonjour !");
    }

    #[tokio::test]
    async fn history_is_sent_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": "toujours dispo ?"},
                    {"role": "assistant", "content": "Oui, toujours en vente."},
                    {"role": "user", "content": "quel prix ?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("11 500 €")))
            .expect(1)
            .mount(&server)
            .await;

        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                content: "toujours dispo ?".to_string(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                content: "Oui, toujours en vente.".to_string(),
            },
        ];

        let assistant =
            HttpAssistant::new(&config_for(&server.uri(), None), settings()).unwrap();
        let reply = assistant.generate_reply(&history, "quel prix ?").await.unwrap();
        assert_eq!(reply, "11 500 €");
    }

    #[tokio::test]
    async fn provider_failure_returns_fallback_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let assistant = HttpAssistant::new(
            &config_for(&server.uri(), Some("Un conseiller vous répondra bientôt.")),
            settings(),
        )
        .unwrap();

        let reply = assistant.generate_reply(&[], "bonjour").await.unwrap();
        assert_eq!(reply, "Un conseiller vous répondra bientôt.");
    }

    #[tokio::test]
    async fn provider_failure_without_fallback_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let assistant =
            HttpAssistant::new(&config_for(&server.uri(), None), settings()).unwrap();
        assert!(assistant.generate_reply(&[], "bonjour").await.is_err());
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let mut config = config_for("http://localhost", None);
        config.api_key = None;
        assert!(HttpAssistant::new(&config, settings()).is_err());
    }
}
