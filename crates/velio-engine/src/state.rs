// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle state machine.
//!
//! States: `active` (initial) -> `negotiation` -> `completed` | `archived`.
//! The only automated transition in this core is active -> negotiation on a
//! detected price offer; everything else requires an explicit operator
//! action through the storage `set_conversation_state` override.
//!
//! Planning is a pure function over a conversation snapshot plus the
//! signals computed from the message; applying the plan is an optimistic
//! read-modify-write guarded on the expected current state, retried once
//! with a fresh read before the conflict is surfaced.

use tracing::{info, warn};

use velio_config::AssistantSettings;
use velio_core::types::{Conversation, ConversationState, StateChange};
use velio_core::{StorageAdapter, VelioError};

use crate::price::{self, PriceSignal};
use crate::signals;

/// Reason recorded on the automated price transition.
pub const PRICE_DETECTED_REASON: &str = "price detected";

/// Signals computed from one inbound message, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSignals {
    /// The message marks the listing as unavailable/sold.
    pub unavailability: bool,
    /// Price-offer detection outcome. Skipped (NoMatch) when the
    /// unavailability signal fired first.
    pub price: PriceSignal,
}

/// Evaluates the signal chain for a message body.
///
/// Unavailability is checked first; a message that says the car is sold is
/// not also treated as a price offer.
pub fn evaluate(body: &str, settings: &AssistantSettings) -> MessageSignals {
    if signals::is_unavailability(body, &settings.unavailability_keywords) {
        return MessageSignals {
            unavailability: true,
            price: PriceSignal::NoMatch,
        };
    }
    MessageSignals {
        unavailability: false,
        price: price::detect(body),
    }
}

/// What the state machine decided for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDecision {
    /// Transition to apply, if any.
    pub transition: Option<Transition>,
    /// Price offer to record for the audit trail, if any.
    pub record_offer: Option<OfferDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ConversationState,
    pub reason: String,
}

/// A price offer pending persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferDraft {
    pub price: f64,
    pub currency: String,
}

impl StateDecision {
    fn unchanged() -> Self {
        Self {
            transition: None,
            record_offer: None,
        }
    }
}

/// Plans the state decision for one inbound message.
///
/// A detected price is always recorded as an offer (audit trail), but the
/// transition to `negotiation` fires only from `active`, only when the
/// pause-on-price-offer flag is set, and never for demo conversations.
pub fn plan(
    conversation: &Conversation,
    signals: &MessageSignals,
    settings: &AssistantSettings,
) -> StateDecision {
    if signals.unavailability {
        // Surfaced to observers by the pipeline; the "mark listing sold"
        // effect stays with the operator.
        return StateDecision::unchanged();
    }

    let Some(price) = signals.price.price() else {
        return StateDecision::unchanged();
    };
    let currency = signals
        .price
        .currency()
        .unwrap_or(price::DEFAULT_CURRENCY)
        .to_string();

    let record_offer = Some(OfferDraft { price, currency });

    if conversation.demo {
        info!(
            conversation_id = conversation.id.as_str(),
            price, "demo conversation: price detected, transition suppressed"
        );
        return StateDecision {
            transition: None,
            record_offer,
        };
    }

    let transition = (settings.pause_on_price_offer
        && conversation.state == ConversationState::Active)
        .then(|| Transition {
            next: ConversationState::Negotiation,
            reason: PRICE_DETECTED_REASON.to_string(),
        });

    StateDecision {
        transition,
        record_offer,
    }
}

/// Applies a planned transition with an optimistic guard on the state the
/// plan was computed against.
///
/// On a lost race the conversation is re-read and the transition retried
/// once if it still applies; a second loss is logged and reported as a
/// conflict. Returns the state the conversation is known to be in
/// afterwards.
pub async fn apply_transition(
    storage: &dyn StorageAdapter,
    conversation: &Conversation,
    transition: &Transition,
    price: f64,
    price_message_id: &str,
    now: &str,
) -> Result<ConversationState, VelioError> {
    let change = StateChange {
        conversation_id: conversation.id.clone(),
        expected: conversation.state,
        next: transition.next,
        reason: transition.reason.clone(),
        at: now.to_string(),
        detected_price: Some(price),
        price_detected_at: Some(now.to_string()),
        price_message_id: Some(price_message_id.to_string()),
    };

    if storage.apply_state_change(&change).await? {
        info!(
            conversation_id = conversation.id.as_str(),
            from = %conversation.state,
            to = %transition.next,
            reason = transition.reason.as_str(),
            "conversation state changed"
        );
        return Ok(transition.next);
    }

    // Lost the race: re-read and retry once if the transition still applies.
    let fresh = storage
        .get_conversation(&conversation.id)
        .await?
        .ok_or_else(|| VelioError::NotFound {
            kind: "conversation",
            id: conversation.id.clone(),
        })?;

    if fresh.state != change.expected {
        // A concurrent writer moved the conversation; the transition no
        // longer applies.
        info!(
            conversation_id = conversation.id.as_str(),
            state = %fresh.state,
            "state changed concurrently, transition dropped"
        );
        return Ok(fresh.state);
    }

    if storage.apply_state_change(&change).await? {
        return Ok(transition.next);
    }

    warn!(
        conversation_id = conversation.id.as_str(),
        expected = %change.expected,
        "state transition lost the race twice"
    );
    Err(VelioError::Conflict {
        conversation_id: conversation.id.clone(),
        expected: change.expected.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use velio_config::AssistantSettings;

    fn conversation(state: ConversationState, demo: bool) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            phone_key: "33612345678".to_string(),
            chat_id: None,
            listing_id: None,
            user_id: None,
            state,
            state_changed_at: None,
            state_change_reason: None,
            detected_price: None,
            price_detected_at: None,
            price_message_id: None,
            demo,
            last_message_at: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn settings(pause: bool) -> AssistantSettings {
        AssistantSettings {
            pause_on_price_offer: pause,
            ..AssistantSettings::default()
        }
    }

    #[test]
    fn price_in_active_state_plans_negotiation() {
        let conv = conversation(ConversationState::Active, false);
        let sig = evaluate("je propose 15000€", &settings(true));
        let decision = plan(&conv, &sig, &settings(true));

        let transition = decision.transition.unwrap();
        assert_eq!(transition.next, ConversationState::Negotiation);
        assert_eq!(transition.reason, PRICE_DETECTED_REASON);
        assert_eq!(decision.record_offer.unwrap().price, 15000.0);
    }

    #[test]
    fn price_outside_active_state_records_offer_without_transition() {
        let conv = conversation(ConversationState::Negotiation, false);
        let sig = evaluate("allez, 14000€", &settings(true));
        let decision = plan(&conv, &sig, &settings(true));

        assert!(decision.transition.is_none());
        assert_eq!(decision.record_offer.unwrap().price, 14000.0);
    }

    #[test]
    fn pause_flag_off_means_no_transition() {
        let conv = conversation(ConversationState::Active, false);
        let sig = evaluate("je propose 15000€", &settings(false));
        let decision = plan(&conv, &sig, &settings(false));

        assert!(decision.transition.is_none());
        assert!(decision.record_offer.is_some());
    }

    #[test]
    fn demo_conversation_never_transitions() {
        let conv = conversation(ConversationState::Active, true);
        let sig = evaluate("je propose 15000€", &settings(true));
        let decision = plan(&conv, &sig, &settings(true));

        assert!(decision.transition.is_none());
        // The offer is still recorded for demo purposes.
        assert!(decision.record_offer.is_some());
    }

    #[test]
    fn unavailability_wins_over_price_detection() {
        let conv = conversation(ConversationState::Active, false);
        let sig = evaluate("déjà vendu à 15000€ désolé", &AssistantSettings::default());
        assert!(sig.unavailability);
        assert_eq!(sig.price, PriceSignal::NoMatch);

        let decision = plan(&conv, &sig, &settings(true));
        assert!(decision.transition.is_none());
        assert!(decision.record_offer.is_none());
    }

    #[test]
    fn plain_message_changes_nothing() {
        let conv = conversation(ConversationState::Active, false);
        let sig = evaluate("bonjour, toujours disponible ?", &settings(true));
        let decision = plan(&conv, &sig, &settings(true));
        assert_eq!(decision, StateDecision::unchanged());
    }
}
