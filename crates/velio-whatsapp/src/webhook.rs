// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook listener for bridge events.
//!
//! The WhatsApp bridge pushes JSON events (`message`, `message_sent`, `qr`,
//! `status`) to this listener. Requests are authenticated with an
//! HMAC-SHA256 signature over the raw body, carried in the
//! `x-velio-signature` header as lowercase hex. Unsigned requests are
//! rejected whenever a secret is configured.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use velio_core::{InboundMessage, TransportStatus, time};

use crate::SharedState;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "x-velio-signature";

/// One event pushed by the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// An inbound chat message.
    Message(BridgeMessage),
    /// A message observed going out from the operator's own account.
    MessageSent(BridgeMessage),
    /// New pairing QR payload.
    Qr { code: String },
    /// Connection status change.
    Status { status: String },
}

/// Message payload as the bridge reports it.
#[derive(Debug, Deserialize)]
pub struct BridgeMessage {
    pub id: Option<String>,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub body: String,
    /// Unix seconds, as chat transports usually report event time.
    pub timestamp: i64,
    #[serde(default)]
    pub from_me: bool,
}

pub(crate) struct WebhookState {
    pub secret: Option<String>,
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    pub shared: Arc<SharedState>,
}

/// POST handler for bridge events.
pub(crate) async fn receive_event(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret, &body, signature) {
            warn!("webhook signature mismatch, event rejected");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let event: BridgeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "undecodable webhook event");
            return StatusCode::BAD_REQUEST;
        }
    };

    match event {
        BridgeEvent::Message(msg) => {
            let inbound = to_inbound(msg, false);
            if state.inbound_tx.send(inbound).await.is_err() {
                warn!("inbound queue closed, message dropped");
                return StatusCode::SERVICE_UNAVAILABLE;
            }
        }
        BridgeEvent::MessageSent(msg) => {
            let inbound = to_inbound(msg, true);
            if state.inbound_tx.send(inbound).await.is_err() {
                warn!("inbound queue closed, outbound event dropped");
                return StatusCode::SERVICE_UNAVAILABLE;
            }
        }
        BridgeEvent::Qr { code } => {
            info!("new pairing code received");
            state.shared.set_pairing_code(Some(code));
            state.shared.set_status(TransportStatus::Pairing);
        }
        BridgeEvent::Status { status } => {
            let parsed = match status.as_str() {
                "connected" | "ready" | "authenticated" => TransportStatus::Connected,
                "qr" | "pairing" => TransportStatus::Pairing,
                _ => TransportStatus::Disconnected,
            };
            info!(status = status.as_str(), "bridge status change");
            if parsed == TransportStatus::Connected {
                // Pairing is complete; the code is stale.
                state.shared.set_pairing_code(None);
            }
            state.shared.set_status(parsed);
        }
    }

    StatusCode::NO_CONTENT
}

/// Maps a bridge message to the channel-agnostic inbound shape.
///
/// For outbound-observed messages the conversation is identified by the
/// recipient, not the operator's own id.
pub fn to_inbound(msg: BridgeMessage, from_me: bool) -> InboundMessage {
    let sender_id = if from_me {
        msg.to.unwrap_or_else(|| msg.from.clone())
    } else {
        msg.from
    };

    let timestamp = chrono::DateTime::from_timestamp(msg.timestamp, 0)
        .map(time::format_millis)
        .unwrap_or_else(time::now_millis);

    InboundMessage {
        sender_id,
        body: msg.body,
        timestamp,
        external_id: msg.id,
        is_from_me: from_me,
    }
}

/// Constant-time-ish signature check: recomputes the HMAC and lets the
/// `hmac` crate's `verify_slice` do the comparison.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let ok = mac.verify_slice(&expected).is_ok();
    if !ok {
        debug!("HMAC verification failed");
    }
    ok
}

/// Computes the hex signature for a body (used by tests and by bridges
/// implementing the sending side).
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
