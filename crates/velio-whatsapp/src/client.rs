// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the bridge's send API.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use velio_core::VelioError;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Client for the bridge's outbound-message endpoint.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: reqwest::Client,
    api_url: String,
}

impl BridgeClient {
    pub fn new(api_url: String, api_token: Option<&str>) -> Result<Self, VelioError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let bearer = format!("Bearer {token}");
            headers.insert(
                "authorization",
                HeaderValue::from_str(&bearer).map_err(|e| {
                    VelioError::Config(format!("invalid whatsapp.api_token value: {e}"))
                })?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VelioError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, api_url })
    }

    /// Sends a message; returns the id the platform assigned.
    pub async fn send(&self, to: &str, body: &str) -> Result<String, VelioError> {
        let url = format!("{}/send", self.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&SendRequest { to, body })
            .send()
            .await
            .map_err(|e| VelioError::Transport {
                message: format!("send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VelioError::Transport {
                message: format!("bridge returned {status}: {text}"),
                source: None,
            });
        }

        let sent: SendResponse = response.json().await.map_err(|e| VelioError::Transport {
            message: format!("malformed send response: {e}"),
            source: Some(Box::new(e)),
        })?;

        debug!(to, external_id = sent.id.as_str(), "message dispatched");
        Ok(sent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_body_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer bridge-token"))
            .and(body_json(serde_json::json!({
                "to": "33612345678@c.us",
                "body": "bonjour"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "wa-out-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BridgeClient::new(server.uri(), Some("bridge-token")).unwrap();
        let id = client.send("33612345678@c.us", "bonjour").await.unwrap();
        assert_eq!(id, "wa-out-1");
    }

    #[tokio::test]
    async fn bridge_error_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = BridgeClient::new(server.uri(), None).unwrap();
        assert!(client.send("33612345678@c.us", "bonjour").await.is_err());
    }
}
