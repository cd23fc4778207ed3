// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible chat-completions API.
//!
//! Provides [`ChatClient`] which handles request construction,
//! authentication, and response decoding against any provider speaking the
//! `/chat/completions` wire shape.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use velio_core::VelioError;

/// One message in the chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP client for chat-completion requests.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl ChatClient {
    /// Creates a new client.
    ///
    /// `base_url` is the provider root (e.g. `https://api.x.ai/v1`); the
    /// `/chat/completions` path is appended per request.
    pub fn new(
        api_key: &str,
        base_url: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, VelioError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {api_key}");
        headers.insert(
            "authorization",
            HeaderValue::from_str(&bearer)
                .map_err(|e| VelioError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| VelioError::Assistant {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            model,
            max_tokens,
        })
    }

    /// Sends a completion request and returns the first choice's content.
    pub async fn complete(&self, messages: &[ApiMessage]) -> Result<String, VelioError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VelioError::Assistant {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VelioError::Assistant {
                message: format!("provider returned {status}: {body}"),
                source: None,
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| VelioError::Assistant {
                message: format!("malformed completion response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VelioError::Assistant {
                message: "completion response has no choices".to_string(),
                source: None,
            })?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}
