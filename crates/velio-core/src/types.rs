// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Velio pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Identifier a transport assigns to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalMessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the wiring layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Assistant,
    Storage,
    Broadcast,
}

/// Lifecycle state of a conversation.
///
/// `Active` is the only state in which the assistant may auto-reply. The
/// price-offer transition moves a conversation to `Negotiation`; `Completed`
/// and `Archived` are reached only by explicit operator action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    #[default]
    Active,
    Negotiation,
    Completed,
    Archived,
}

/// A persisted conversation with one canonical contact identity.
///
/// At most one conversation exists per `phone_key`. The `detected_price` and
/// `price_message_id` fields are set and cleared together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Digits-only canonical contact key (natural unique key).
    pub phone_key: String,
    /// External chat-transport identifier, when known.
    pub chat_id: Option<String>,
    pub listing_id: Option<String>,
    pub user_id: Option<String>,
    pub state: ConversationState,
    pub state_changed_at: Option<String>,
    pub state_change_reason: Option<String>,
    pub detected_price: Option<f64>,
    pub price_detected_at: Option<String>,
    pub price_message_id: Option<String>,
    /// Sandbox flag: demo conversations never auto-transition.
    pub demo: bool,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

/// A persisted message within a conversation.
///
/// Ordering within a conversation is by `timestamp` (authoritative event
/// time), never by insertion order -- late history backfills must sort
/// correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub body: String,
    pub is_from_me: bool,
    /// Transport message id, used for idempotent replay detection.
    pub external_id: Option<String>,
    /// RFC 3339 event time (distinct from storage insertion time).
    pub timestamp: String,
    pub user_id: Option<String>,
    pub created_at: String,
}

/// A detected monetary offer, recorded for negotiation tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOffer {
    pub id: String,
    pub conversation_id: String,
    pub listing_id: Option<String>,
    pub message_id: Option<String>,
    pub user_id: Option<String>,
    pub offered_price: f64,
    pub currency: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
}

/// A vehicle listing the conversation may be about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub phone: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub asking_price: Option<f64>,
    pub contact_status: String,
    pub user_id: Option<String>,
    pub updated_at: Option<String>,
}

/// An inbound message event delivered by a transport adapter.
///
/// `is_from_me` marks messages the transport observed going out from the
/// operator's own account (they are ingested for history, never replied to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Raw transport sender/recipient identifier (e.g. `33612345678@c.us`).
    pub sender_id: String,
    pub body: String,
    /// RFC 3339 event time as reported by the transport.
    pub timestamp: String,
    pub external_id: Option<String>,
    pub is_from_me: bool,
}

/// An outbound message to be dispatched through a transport adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub body: String,
}

/// Connection status reported by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransportStatus {
    Connected,
    Disconnected,
    /// Waiting for the operator to pair the device (QR / pairing code).
    Pairing,
}

/// One turn of conversation history handed to the assistant provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Who produced a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Fire-and-forget event published to the broadcast layer.
///
/// Event names mirror the UI contract: `new_message`,
/// `price_offer_detected`, `listing_unavailable_signal`, `transport_status`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    NewMessage {
        id: String,
        conversation_id: String,
        phone_key: String,
        body: String,
        is_from_me: bool,
        timestamp: String,
    },
    PriceOfferDetected {
        conversation_id: String,
        listing_id: Option<String>,
        price: f64,
        currency: String,
        phone_key: String,
        message_body: String,
        timestamp: String,
    },
    ListingUnavailableSignal {
        conversation_id: String,
        listing_id: Option<String>,
        phone_key: String,
        message_body: String,
    },
    TransportStatus {
        status: TransportStatus,
    },
}

/// A planned, optimistic conversation-state update.
///
/// Applied as `UPDATE ... WHERE id = ? AND state = ?expected`; a non-match
/// means a concurrent writer won and the caller must re-read.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub conversation_id: String,
    pub expected: ConversationState,
    pub next: ConversationState,
    pub reason: String,
    pub at: String,
    /// Set together with `price_message_id` or not at all.
    pub detected_price: Option<f64>,
    pub price_detected_at: Option<String>,
    pub price_message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn conversation_state_round_trips_through_strings() {
        for state in [
            ConversationState::Active,
            ConversationState::Negotiation,
            ConversationState::Completed,
            ConversationState::Archived,
        ] {
            let s = state.to_string();
            assert_eq!(ConversationState::from_str(&s).unwrap(), state);
        }
        assert_eq!(ConversationState::Active.to_string(), "active");
    }

    #[test]
    fn conversation_state_defaults_to_active() {
        assert_eq!(ConversationState::default(), ConversationState::Active);
    }

    #[test]
    fn engine_event_serializes_with_snake_case_tag() {
        let event = EngineEvent::NewMessage {
            id: "m1".into(),
            conversation_id: "c1".into(),
            phone_key: "33612345678".into(),
            body: "hello".into(),
            is_from_me: false,
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_message");
        assert_eq!(json["conversation_id"], "c1");
    }

    #[test]
    fn transport_status_serializes_lowercase() {
        let json = serde_json::to_string(&TransportStatus::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
    }
}
