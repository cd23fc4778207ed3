// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` implements `TransportAdapter` with injectable inbound
//! messages and captured outbound messages for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use velio_core::types::ExternalMessageId;
use velio_core::{
    AdapterType, HealthStatus, InboundMessage, OutboundMessage, PluginAdapter, TransportAdapter,
    TransportStatus, VelioError,
};

/// A mock chat transport for testing.
///
/// Provides two queues:
/// - **inbound**: messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured and retrievable via `sent_messages()`
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    notify: Arc<Notify>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// All messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Make every subsequent `send()` fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, VelioError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VelioError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn connect(&mut self) -> Result<(), VelioError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<ExternalMessageId, VelioError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(VelioError::Transport {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        Ok(ExternalMessageId(id))
    }

    async fn receive(&self) -> Result<InboundMessage, VelioError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            // Wait for notification that a new message was injected.
            self.notify.notified().await;
        }
    }

    fn status(&self) -> TransportStatus {
        TransportStatus::Connected
    }

    fn pairing_code(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_inbound(text: &str) -> InboundMessage {
        InboundMessage {
            sender_id: "33612345678@c.us".to_string(),
            body: text.to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            external_id: Some(format!("test-{}", uuid::Uuid::new_v4())),
            is_from_me: false,
        }
    }

    #[tokio::test]
    async fn receive_returns_injected_messages() {
        let transport = MockTransport::new();
        transport.inject_message(make_inbound("hello")).await;

        let received = transport.receive().await.unwrap();
        assert_eq!(received.sender_id, "33612345678@c.us");
        assert_eq!(received.body, "hello");
    }

    #[tokio::test]
    async fn send_captures_outbound_messages() {
        let transport = MockTransport::new();
        let msg = OutboundMessage {
            recipient_id: "33612345678@c.us".to_string(),
            body: "response text".to_string(),
        };

        let msg_id = transport.send(msg).await.unwrap();
        assert!(msg_id.0.starts_with("mock-msg-"));

        let sent = transport.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "response text");
    }

    #[tokio::test]
    async fn failing_sends_return_transport_error() {
        let transport = MockTransport::new();
        transport.fail_sends(true);
        let result = transport
            .send(OutboundMessage {
                recipient_id: "x".to_string(),
                body: "y".to_string(),
            })
            .await;
        assert!(result.is_err());
        assert_eq!(transport.sent_count().await, 0);
    }
}
