// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp transport adapter for the Velio sales assistant.
//!
//! Implements [`TransportAdapter`] against a WhatsApp bridge: outbound
//! messages go to the bridge's HTTP API, inbound events (messages, pairing
//! QR codes, connection status) arrive on a local webhook listener
//! authenticated with an HMAC-SHA256 body signature.

pub mod client;
pub mod webhook;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::{Router, routing::post};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use velio_config::model::WhatsAppConfig;
use velio_core::types::ExternalMessageId;
use velio_core::{
    AdapterType, HealthStatus, InboundMessage, OutboundMessage, PluginAdapter, TransportAdapter,
    TransportStatus, VelioError,
};

use client::BridgeClient;
use webhook::WebhookState;

/// Connection state shared between the webhook handler and the adapter.
pub struct SharedState {
    status: RwLock<TransportStatus>,
    pairing_code: RwLock<Option<String>>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            status: RwLock::new(TransportStatus::Disconnected),
            pairing_code: RwLock::new(None),
        }
    }

    pub(crate) fn set_status(&self, status: TransportStatus) {
        if let Ok(mut guard) = self.status.write() {
            *guard = status;
        }
    }

    pub(crate) fn set_pairing_code(&self, code: Option<String>) {
        if let Ok(mut guard) = self.pairing_code.write() {
            *guard = code;
        }
    }

    fn status(&self) -> TransportStatus {
        self.status
            .read()
            .map(|s| s.clone())
            .unwrap_or(TransportStatus::Disconnected)
    }

    fn pairing_code(&self) -> Option<String> {
        self.pairing_code.read().ok().and_then(|c| c.clone())
    }
}

/// WhatsApp transport adapter.
pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    bridge: BridgeClient,
    shared: Arc<SharedState>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    listener_handle: Option<tokio::task::JoinHandle<()>>,
}

impl WhatsAppTransport {
    /// Creates the adapter. Requires `config.api_url` to be set.
    pub fn new(config: WhatsAppConfig) -> Result<Self, VelioError> {
        let api_url = config
            .api_url
            .clone()
            .ok_or_else(|| VelioError::Config("whatsapp.api_url is required".into()))?;

        let bridge = BridgeClient::new(api_url, config.api_token.as_deref())?;
        let (inbound_tx, inbound_rx) = mpsc::channel(512);

        Ok(Self {
            config,
            bridge,
            shared: Arc::new(SharedState::new()),
            inbound_rx: Mutex::new(inbound_rx),
            inbound_tx,
            listener_handle: None,
        })
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, VelioError> {
        match self.shared.status() {
            TransportStatus::Connected => Ok(HealthStatus::Healthy),
            TransportStatus::Pairing => Ok(HealthStatus::Degraded(
                "waiting for device pairing".to_string(),
            )),
            TransportStatus::Disconnected => Ok(HealthStatus::Unhealthy(
                "bridge not connected".to_string(),
            )),
        }
    }

    async fn shutdown(&self) -> Result<(), VelioError> {
        debug!("WhatsApp transport shutting down");
        if let Some(handle) = &self.listener_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for WhatsAppTransport {
    async fn connect(&mut self) -> Result<(), VelioError> {
        if self.listener_handle.is_some() {
            return Ok(()); // Already connected
        }

        let state = Arc::new(WebhookState {
            secret: self.config.webhook_secret.clone(),
            inbound_tx: self.inbound_tx.clone(),
            shared: Arc::clone(&self.shared),
        });

        let app = Router::new()
            .route("/webhook", post(webhook::receive_event))
            .with_state(state);

        let addr = format!(
            "{}:{}",
            self.config.webhook_host, self.config.webhook_port
        );
        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| VelioError::Transport {
                    message: format!("failed to bind webhook listener to {addr}: {e}"),
                    source: Some(Box::new(e)),
                })?;

        info!(addr = addr.as_str(), "webhook listener started");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "webhook listener stopped");
            }
        });
        self.listener_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<ExternalMessageId, VelioError> {
        let id = self.bridge.send(&msg.recipient_id, &msg.body).await?;
        Ok(ExternalMessageId(id))
    }

    async fn receive(&self) -> Result<InboundMessage, VelioError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| VelioError::Transport {
            message: "webhook inbound channel closed".to_string(),
            source: None,
        })
    }

    fn status(&self) -> TransportStatus {
        self.shared.status()
    }

    fn pairing_code(&self) -> Option<String> {
        self.shared.pairing_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WhatsAppConfig {
        WhatsAppConfig {
            api_url: Some("http://127.0.0.1:9".to_string()),
            api_token: None,
            webhook_secret: Some("secret".to_string()),
            webhook_host: "127.0.0.1".to_string(),
            webhook_port: 0,
        }
    }

    #[test]
    fn new_requires_api_url() {
        let mut cfg = config();
        cfg.api_url = None;
        assert!(WhatsAppTransport::new(cfg).is_err());
    }

    #[test]
    fn starts_disconnected_without_pairing_code() {
        let transport = WhatsAppTransport::new(config()).unwrap();
        assert_eq!(transport.status(), TransportStatus::Disconnected);
        assert!(transport.pairing_code().is_none());
    }

    #[tokio::test]
    async fn status_follows_shared_state() {
        let transport = WhatsAppTransport::new(config()).unwrap();
        transport.shared.set_status(TransportStatus::Pairing);
        transport.shared.set_pairing_code(Some("QR".to_string()));

        assert_eq!(transport.status(), TransportStatus::Pairing);
        assert_eq!(transport.pairing_code().as_deref(), Some("QR"));
        assert!(matches!(
            transport.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
