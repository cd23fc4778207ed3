// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete ingestion pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, mock
//! transport and assistant, and drives the pipeline with realistic inbound
//! events. Tests are independent and order-insensitive.

use velio_core::types::Listing;
use velio_core::{ConversationState, EngineEvent, InboundMessage};
use velio_engine::IngestOutcome;
use velio_test_utils::TestHarness;

const CONTACT: &str = "33612345678@c.us";

fn persisted(outcome: IngestOutcome) -> (String, String, ConversationState, bool) {
    match outcome {
        IngestOutcome::Persisted {
            conversation_id,
            message_id,
            state,
            replied,
        } => (conversation_id, message_id, state, replied),
        other => panic!("expected Persisted, got {other:?}"),
    }
}

// ---- Keyword-triggered auto-reply ----

#[tokio::test]
async fn keyword_message_gets_auto_reply() {
    let harness = TestHarness::builder()
        .with_keywords(&["price", "hello"])
        .with_mock_responses(vec!["Hi! The car is still available.".to_string()])
        .build()
        .await
        .unwrap();

    let outcome = harness.ingest_text(CONTACT, "Hello").await.unwrap();
    let (conversation_id, _, state, replied) = persisted(outcome);

    assert_eq!(state, ConversationState::Active);
    assert!(replied);
    assert_eq!(harness.transport.sent_count().await, 1);

    // Inbound plus the persisted reply.
    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(!messages[0].is_from_me);
    assert!(messages[1].is_from_me);
    assert_eq!(messages[1].body, "Hi! The car is still available.");
}

#[tokio::test]
async fn non_keyword_message_stays_silent() {
    let harness = TestHarness::builder()
        .with_keywords(&["price", "hello"])
        .build()
        .await
        .unwrap();

    let outcome = harness.ingest_text(CONTACT, "ok").await.unwrap();
    let (_, _, _, replied) = persisted(outcome);

    assert!(!replied);
    assert_eq!(harness.transport.sent_count().await, 0);
}

#[tokio::test]
async fn respond_to_all_answers_everything() {
    let harness = TestHarness::builder()
        .with_keywords(&[])
        .with_respond_to_all(true)
        .build()
        .await
        .unwrap();

    let outcome = harness.ingest_text(CONTACT, "whatever").await.unwrap();
    let (_, _, _, replied) = persisted(outcome);
    assert!(replied);
}

// ---- Price offers and the state machine ----

#[tokio::test]
async fn price_offer_moves_active_conversation_to_negotiation() {
    let harness = TestHarness::builder().with_respond_to_all(true).build().await.unwrap();

    let outcome = harness.ingest_text(CONTACT, "je propose 15000€").await.unwrap();
    let (conversation_id, message_id, state, replied) = persisted(outcome);

    assert_eq!(state, ConversationState::Negotiation);
    // The transition suppresses the same message's auto-reply.
    assert!(!replied);
    assert_eq!(harness.transport.sent_count().await, 0);

    let conversation = harness
        .storage
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.state, ConversationState::Negotiation);
    assert_eq!(conversation.detected_price, Some(15000.0));
    assert_eq!(conversation.price_message_id.as_deref(), Some(message_id.as_str()));
    assert_eq!(conversation.state_change_reason.as_deref(), Some("price detected"));

    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].offered_price, 15000.0);
    assert_eq!(offers[0].currency, "EUR");
    assert_eq!(offers[0].status, "pending");
}

#[tokio::test]
async fn full_negotiation_scenario() {
    let harness = TestHarness::builder()
        .with_keywords(&["hello", "price"])
        .with_mock_responses(vec!["Bonjour !".to_string()])
        .build()
        .await
        .unwrap();

    // Message 1: keyword, auto-reply fires, state stays active.
    let (conversation_id, _, state, replied) =
        persisted(harness.ingest_text(CONTACT, "Hello").await.unwrap());
    assert_eq!(state, ConversationState::Active);
    assert!(replied);
    assert_eq!(harness.transport.sent_count().await, 1);

    // Message 2: price offer, state moves to negotiation, no reply.
    let (_, _, state, replied) =
        persisted(harness.ingest_text(CONTACT, "I offer 12000€").await.unwrap());
    assert_eq!(state, ConversationState::Negotiation);
    assert!(!replied);
    assert_eq!(harness.transport.sent_count().await, 1);

    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].offered_price, 12000.0);
}

#[tokio::test]
async fn second_price_in_negotiation_keeps_state_but_records_offer() {
    let harness = TestHarness::builder().build().await.unwrap();

    let (conversation_id, _, _, _) =
        persisted(harness.ingest_text(CONTACT, "je propose 15000€").await.unwrap());
    let (_, _, state, _) =
        persisted(harness.ingest_text(CONTACT, "allez, 14000€ dernier prix").await.unwrap());

    assert_eq!(state, ConversationState::Negotiation);

    let conversation = harness
        .storage
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    // The first detection owns the conversation-level price fields.
    assert_eq!(conversation.detected_price, Some(15000.0));

    // Both detections are on the audit trail.
    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert_eq!(offers.len(), 2);
}

#[tokio::test]
async fn pause_flag_off_records_offer_without_transition() {
    let harness = TestHarness::builder()
        .with_pause_on_price_offer(false)
        .build()
        .await
        .unwrap();

    let (conversation_id, _, state, _) =
        persisted(harness.ingest_text(CONTACT, "je propose 15000€").await.unwrap());

    assert_eq!(state, ConversationState::Active);
    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert_eq!(offers.len(), 1);
}

#[tokio::test]
async fn demo_conversation_never_leaves_active() {
    let harness = TestHarness::builder()
        .with_demo_numbers(&["33123456789"])
        .build()
        .await
        .unwrap();

    let demo_contact = "33123456789@c.us";
    let (conversation_id, _, state, _) =
        persisted(harness.ingest_text(demo_contact, "je propose 15000€").await.unwrap());

    assert_eq!(state, ConversationState::Active);
    let conversation = harness
        .storage
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert!(conversation.demo);
    assert_eq!(conversation.state, ConversationState::Active);
    assert!(conversation.detected_price.is_none());

    // The price is still logged as an offer for demo purposes.
    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert_eq!(offers.len(), 1);
}

#[tokio::test]
async fn operator_override_reopens_conversation() {
    let harness = TestHarness::builder()
        .with_respond_to_all(true)
        .with_mock_responses(vec!["On en discute !".to_string(), "Bien reçu.".to_string()])
        .build()
        .await
        .unwrap();

    let (conversation_id, _, state, _) =
        persisted(harness.ingest_text(CONTACT, "je propose 15000€").await.unwrap());
    assert_eq!(state, ConversationState::Negotiation);

    // Operator takes over, then reopens.
    let reopened = harness
        .storage
        .set_conversation_state(
            &conversation_id,
            ConversationState::Active,
            "negotiation settled by operator",
            "2026-01-02T00:00:00.000Z",
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reopened.state, ConversationState::Active);

    // Auto-replies resume.
    let (_, _, _, replied) =
        persisted(harness.ingest_text(CONTACT, "d'accord merci").await.unwrap());
    assert!(replied);
}

// ---- Duplicate suppression and idempotence ----

#[tokio::test]
async fn replaying_the_same_external_id_is_idempotent() {
    let harness = TestHarness::builder().with_respond_to_all(true).build().await.unwrap();

    let inbound = InboundMessage {
        sender_id: CONTACT.to_string(),
        body: "je propose 15000€".to_string(),
        timestamp: "2026-01-01T10:00:00.000Z".to_string(),
        external_id: Some("wa-replay-1".to_string()),
        is_from_me: false,
    };

    let first = harness.ingest(inbound.clone()).await.unwrap();
    let (conversation_id, _, state, _) = persisted(first);
    assert_eq!(state, ConversationState::Negotiation);

    let second = harness.ingest(inbound).await.unwrap();
    assert!(matches!(second, IngestOutcome::Duplicate { .. }));

    // One message row, one transition, one offer.
    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 1);
    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert_eq!(offers.len(), 1);
}

#[tokio::test]
async fn content_duplicates_within_ten_seconds_are_suppressed() {
    let harness = TestHarness::builder().build().await.unwrap();

    let make = |ts: &str| InboundMessage {
        sender_id: CONTACT.to_string(),
        body: "ok pour demain".to_string(),
        timestamp: ts.to_string(),
        external_id: None,
        is_from_me: false,
    };

    let (conversation_id, _, _, _) = persisted(
        harness.ingest(make("2026-01-01T10:00:00.000Z")).await.unwrap(),
    );

    // 8 seconds later: same body, same direction -> duplicate.
    let outcome = harness.ingest(make("2026-01-01T10:00:08.000Z")).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Duplicate { .. }));

    // 11 seconds after the first: outside the window -> a second message.
    let outcome = harness.ingest(make("2026-01-01T10:00:11.000Z")).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Persisted { .. }));

    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn sweep_removes_stored_duplicates_keeping_earliest() {
    let harness = TestHarness::builder().build().await.unwrap();

    let (conversation_id, _, _, _) =
        persisted(harness.ingest_text(CONTACT, "bonjour").await.unwrap());

    // Two copies of the same logical event slipped into storage (e.g. via
    // a backfill path without the pre-insertion check).
    for (id, ts) in [("dup-a", "2026-01-01T10:00:01.000Z"), ("dup-b", "2026-01-01T10:00:04.000Z")] {
        harness
            .storage
            .insert_message(&velio_core::types::MessageRecord {
                id: id.to_string(),
                conversation_id: conversation_id.clone(),
                body: "même message".to_string(),
                is_from_me: false,
                external_id: None,
                timestamp: ts.to_string(),
                user_id: None,
                created_at: ts.to_string(),
            })
            .await
            .unwrap();
    }

    let removed = harness.pipeline.sweep_duplicates(&conversation_id).await.unwrap();
    assert_eq!(removed, 1);

    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    let bodies: Vec<_> = messages.iter().filter(|m| m.body == "même message").collect();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].id, "dup-a"); // earliest wins
}

// ---- Unavailability signal and listing side effects ----

async fn insert_listing(harness: &TestHarness, id: &str, phone: &str) {
    harness
        .storage
        .insert_listing(&Listing {
            id: id.to_string(),
            phone: Some(phone.to_string()),
            make: Some("Peugeot".to_string()),
            model: Some("208".to_string()),
            year: Some(2020),
            asking_price: Some(13500.0),
            contact_status: "new".to_string(),
            user_id: Some("u1".to_string()),
            updated_at: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn exchange_marks_listing_contacted() {
    let harness = TestHarness::builder().build().await.unwrap();
    insert_listing(&harness, "l1", "33612345678").await;

    let (conversation_id, _, _, _) =
        persisted(harness.ingest_text(CONTACT, "bonjour").await.unwrap());

    let conversation = harness
        .storage
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.listing_id.as_deref(), Some("l1"));
    assert_eq!(conversation.user_id.as_deref(), Some("u1"));

    let listing = harness.storage.get_listing("l1").await.unwrap().unwrap();
    assert_eq!(listing.contact_status, "contacted");
}

#[tokio::test]
async fn unavailability_signal_skips_contact_update_and_is_surfaced() {
    let harness = TestHarness::builder().with_respond_to_all(true).build().await.unwrap();
    insert_listing(&harness, "l1", "33612345678").await;

    let (conversation_id, _, state, _) =
        persisted(harness.ingest_text(CONTACT, "désolé, déjà vendu").await.unwrap());

    // No state transition and no price offer out of a sold notice.
    assert_eq!(state, ConversationState::Active);
    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert!(offers.is_empty());

    // Listing untouched: the operator decides what "sold" means.
    let listing = harness.storage.get_listing("l1").await.unwrap().unwrap();
    assert_eq!(listing.contact_status, "new");

    // But the signal is surfaced to observers.
    let events = harness.broadcast.events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::ListingUnavailableSignal { listing_id: Some(id), .. } if id == "l1"
    )));
}

// ---- Observer notifications ----

#[tokio::test]
async fn inbound_event_is_published_before_the_reply_event() {
    let harness = TestHarness::builder()
        .with_respond_to_all(true)
        .with_mock_responses(vec!["avec plaisir".to_string()])
        .build()
        .await
        .unwrap();

    harness.ingest_text(CONTACT, "des infos ?").await.unwrap();

    let directions: Vec<bool> = harness
        .broadcast
        .events()
        .iter()
        .filter_map(|e| match e {
            EngineEvent::NewMessage { is_from_me, .. } => Some(*is_from_me),
            _ => None,
        })
        .collect();
    assert_eq!(directions, vec![false, true]);
}

#[tokio::test]
async fn price_detection_publishes_offer_event() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness.ingest_text(CONTACT, "mon dernier prix est 12k€").await.unwrap();

    let events = harness.broadcast.events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::PriceOfferDetected { price, .. } if *price == 12000.0
    )));
}

// ---- Failure semantics ----

#[tokio::test]
async fn assistant_failure_means_silence_not_an_error() {
    let harness = TestHarness::builder().with_respond_to_all(true).build().await.unwrap();
    harness.assistant.fail_replies(true);

    let outcome = harness.ingest_text(CONTACT, "bonjour").await.unwrap();
    let (conversation_id, _, _, replied) = persisted(outcome);

    assert!(!replied);
    assert_eq!(harness.transport.sent_count().await, 0);
    // The inbound message stays recorded.
    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn dispatch_failure_leaves_inbound_recorded_and_no_reply_row() {
    let harness = TestHarness::builder().with_respond_to_all(true).build().await.unwrap();
    harness.transport.fail_sends(true);

    let outcome = harness.ingest_text(CONTACT, "bonjour").await.unwrap();
    let (conversation_id, _, _, replied) = persisted(outcome);

    assert!(!replied);
    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].is_from_me);
}

// ---- Outbound-observed messages ----

#[tokio::test]
async fn operator_messages_are_ingested_without_signals_or_replies() {
    let harness = TestHarness::builder().with_respond_to_all(true).build().await.unwrap();

    let outcome = harness
        .ingest(InboundMessage {
            sender_id: CONTACT.to_string(),
            body: "je peux vous le laisser à 13000€".to_string(),
            timestamp: "2026-01-01T10:00:00.000Z".to_string(),
            external_id: Some("wa-out-1".to_string()),
            is_from_me: true,
        })
        .await
        .unwrap();
    let (conversation_id, _, state, replied) = persisted(outcome);

    // The operator quoting a price is not a counterpart offer.
    assert_eq!(state, ConversationState::Active);
    assert!(!replied);
    let offers = harness.storage.list_price_offers(&conversation_id).await.unwrap();
    assert!(offers.is_empty());

    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].is_from_me);
}

// ---- Worker path ----

#[tokio::test]
async fn dispatched_messages_for_one_conversation_are_processed_in_order() {
    let harness = TestHarness::builder().build().await.unwrap();

    for (i, body) in ["premier", "deuxième", "troisième"].iter().enumerate() {
        harness
            .pipeline
            .dispatch(InboundMessage {
                sender_id: CONTACT.to_string(),
                body: body.to_string(),
                timestamp: format!("2026-01-01T10:00:0{i}.000Z"),
                external_id: Some(format!("wa-order-{i}")),
                is_from_me: false,
            })
            .await;
    }

    // The worker drains its queue serially; poll (bounded) until done.
    let mut conversation_id = None;
    for _ in 0..500 {
        if let Some(conversation) = harness
            .storage
            .find_conversation_by_phone("33612345678")
            .await
            .unwrap()
        {
            let messages = harness.storage.get_messages(&conversation.id, None).await.unwrap();
            if messages.len() == 3 {
                conversation_id = Some(conversation.id);
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let conversation_id = conversation_id.expect("worker did not process all messages in time");

    let messages = harness.storage.get_messages(&conversation_id, None).await.unwrap();
    let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["premier", "deuxième", "troisième"]);

    harness.cancel.cancel();
    harness.pipeline.drain().await;
}
