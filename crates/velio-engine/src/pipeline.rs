// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ingestion pipeline.
//!
//! For every inbound message: normalize the sender, find-or-create the
//! conversation, suppress duplicates, persist, detect signals, run the
//! state machine, decide auto-respond against the post-transition state,
//! notify observers, and (maybe) generate and dispatch a delayed reply.
//!
//! Concurrency model: one worker task per canonical phone key, fed by an
//! mpsc queue. Messages for different conversations process concurrently
//! with no ordering guarantee; messages within one conversation are
//! strictly serialized, so the response delay suspends only that
//! conversation's worker and a second inbound message queues behind the
//! pending reply instead of racing it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use velio_config::{AssistantSettings, SettingsHandle};
use velio_core::types::{ChatRole, ChatTurn, Conversation, MessageRecord, PriceOffer};
use velio_core::{
    AssistantAdapter, BroadcastAdapter, ConversationState, EngineEvent, InboundMessage,
    OutboundMessage, StorageAdapter, TransportAdapter, TransportStatus, VelioError, time,
};

use crate::{dedupe, delay, phone, policy, state};

/// Per-conversation worker queue depth.
const WORKER_QUEUE_DEPTH: usize = 64;

/// What the pipeline did with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Re-delivery of an already-stored message; receipt acknowledged,
    /// nothing persisted.
    Duplicate { conversation_id: String },
    /// Message persisted (and possibly replied to).
    Persisted {
        conversation_id: String,
        message_id: String,
        state: ConversationState,
        replied: bool,
    },
}

/// The ingestion pipeline. Shared behind an `Arc` between the engine loop
/// and the gateway.
pub struct IngestPipeline {
    storage: Arc<dyn StorageAdapter>,
    transport: Arc<dyn TransportAdapter>,
    assistant: Arc<dyn AssistantAdapter>,
    broadcast: Arc<dyn BroadcastAdapter>,
    settings: SettingsHandle,
    workers: DashMap<String, mpsc::Sender<InboundMessage>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        transport: Arc<dyn TransportAdapter>,
        assistant: Arc<dyn AssistantAdapter>,
        broadcast: Arc<dyn BroadcastAdapter>,
        settings: SettingsHandle,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            transport,
            assistant,
            broadcast,
            settings,
            workers: DashMap::new(),
            tracker: TaskTracker::new(),
            cancel,
        })
    }

    /// Routes an inbound message onto its conversation's worker queue,
    /// spawning the worker on first contact.
    pub async fn dispatch(self: &Arc<Self>, inbound: InboundMessage) {
        let key = phone::normalize(&inbound.sender_id);
        if key.is_empty() {
            warn!(sender_id = inbound.sender_id.as_str(), "sender id has no digits, dropped");
            return;
        }

        let tx = self
            .workers
            .entry(key.clone())
            .or_insert_with(|| self.spawn_worker(key.clone()))
            .clone();

        if tx.send(inbound).await.is_err() {
            // Worker exited (shutdown); the message is dropped with the queue.
            debug!(key = key.as_str(), "worker queue closed, message dropped");
        }
    }

    fn spawn_worker(self: &Arc<Self>, key: String) -> mpsc::Sender<InboundMessage> {
        let (tx, mut rx) = mpsc::channel::<InboundMessage>(WORKER_QUEUE_DEPTH);
        let pipeline = Arc::clone(self);
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            loop {
                tokio::select! {
                    maybe = rx.recv() => match maybe {
                        Some(inbound) => {
                            if let Err(e) = pipeline.handle_message(inbound).await {
                                error!(key = key.as_str(), error = %e, "message processing failed");
                            }
                        }
                        None => break,
                    },
                    _ = cancel.cancelled() => break,
                }
            }
            debug!(key = key.as_str(), "conversation worker stopped");
        });

        tx
    }

    /// Waits for all conversation workers to finish their current message.
    pub async fn drain(&self) {
        self.workers.clear();
        self.tracker.close();
        self.tracker.wait().await;
        info!("ingestion pipeline drained");
    }

    /// On-demand duplicate sweep for one conversation (safety net behind
    /// the pre-insertion check).
    pub async fn sweep_duplicates(&self, conversation_id: &str) -> Result<usize, VelioError> {
        dedupe::sweep_conversation(self.storage.as_ref(), conversation_id).await
    }

    /// Publishes the transport's connection status to observers.
    pub fn publish_transport_status(&self, status: TransportStatus) {
        self.broadcast.publish(EngineEvent::TransportStatus { status });
    }

    /// Processes one message through the full pipeline.
    ///
    /// This is the serialized body the conversation workers run; it is also
    /// callable directly (gateway send path, tests).
    pub async fn handle_message(
        &self,
        inbound: InboundMessage,
    ) -> Result<IngestOutcome, VelioError> {
        let settings = self.settings.current();

        let key = phone::normalize(&inbound.sender_id);
        if key.is_empty() {
            return Err(VelioError::Internal(format!(
                "sender id normalizes to nothing: {}",
                inbound.sender_id
            )));
        }

        let is_demo_number = settings
            .demo_numbers
            .iter()
            .any(|d| phone::normalize(d) == key);

        let mut conversation = self
            .storage
            .find_or_create_conversation(&key, Some(&inbound.sender_id), is_demo_number)
            .await?;
        conversation.demo = conversation.demo || is_demo_number;

        debug!(
            conversation_id = conversation.id.as_str(),
            state = %conversation.state,
            demo = conversation.demo,
            "processing inbound message"
        );

        // Event time, canonicalized for window queries; the transport's
        // clock is authoritative, ingestion time is only a fallback.
        let timestamp = time::canonical(&inbound.timestamp).unwrap_or_else(time::now_millis);

        if dedupe::is_duplicate(
            self.storage.as_ref(),
            &conversation.id,
            &inbound.body,
            inbound.is_from_me,
            &timestamp,
            inbound.external_id.as_deref(),
        )
        .await?
        {
            debug!(conversation_id = conversation.id.as_str(), "duplicate suppressed");
            return Ok(IngestOutcome::Duplicate {
                conversation_id: conversation.id,
            });
        }

        // Persist before any side effect; a failure here aborts the
        // pipeline for this message so nothing downstream fires.
        let now = time::now_millis();
        let message = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            body: inbound.body.clone(),
            is_from_me: inbound.is_from_me,
            external_id: inbound.external_id.clone(),
            timestamp: timestamp.clone(),
            user_id: conversation.user_id.clone(),
            created_at: now.clone(),
        };
        self.storage.insert_message(&message).await?;
        self.storage
            .touch_last_message(&conversation.id, &now)
            .await?;

        // Outbound messages observed from the operator's own account are
        // history only: no signals, no auto-reply.
        if inbound.is_from_me {
            self.publish_message(&conversation, &message);
            return Ok(IngestOutcome::Persisted {
                conversation_id: conversation.id,
                message_id: message.id,
                state: conversation.state,
                replied: false,
            });
        }

        let signals = state::evaluate(&inbound.body, &settings);

        if signals.unavailability {
            info!(
                conversation_id = conversation.id.as_str(),
                "unavailability signal detected"
            );
            self.broadcast.publish(EngineEvent::ListingUnavailableSignal {
                conversation_id: conversation.id.clone(),
                listing_id: conversation.listing_id.clone(),
                phone_key: key.clone(),
                message_body: inbound.body.clone(),
            });
        } else if let Some(listing_id) = conversation.listing_id.as_deref() {
            // Exchange activity marks the listing as contacted.
            if let Err(e) = self
                .storage
                .set_listing_contact_status(listing_id, "contacted", &now)
                .await
            {
                warn!(listing_id, error = %e, "listing contact-status update failed");
            }
        }

        let decision = state::plan(&conversation, &signals, &settings);

        if let Some(draft) = &decision.record_offer {
            self.record_offer(&conversation, &message, draft, &inbound, &key, &now)
                .await;
        }

        let mut current_state = conversation.state;
        if let Some(transition) = &decision.transition {
            let price = decision
                .record_offer
                .as_ref()
                .map(|o| o.price)
                .unwrap_or_default();
            match state::apply_transition(
                self.storage.as_ref(),
                &conversation,
                transition,
                price,
                &message.id,
                &now,
            )
            .await
            {
                Ok(next) => current_state = next,
                Err(e) => warn!(
                    conversation_id = conversation.id.as_str(),
                    error = %e,
                    "state transition not applied"
                ),
            }
        }

        // The auto-respond decision uses the post-transition state: the
        // message that triggered negotiation is never auto-answered.
        let should_reply = current_state == ConversationState::Active
            && policy::should_auto_respond(&inbound.body, &settings);

        debug!(
            conversation_id = conversation.id.as_str(),
            state = %current_state,
            should_reply,
            "auto-respond decision"
        );

        // Observers see the inbound message before any assistant latency.
        self.publish_message(&conversation, &message);

        let mut replied = false;
        if should_reply {
            replied = self
                .generate_and_send_reply(&conversation, &message, &inbound, &settings)
                .await;
        }

        Ok(IngestOutcome::Persisted {
            conversation_id: conversation.id,
            message_id: message.id,
            state: current_state,
            replied,
        })
    }

    async fn record_offer(
        &self,
        conversation: &Conversation,
        message: &MessageRecord,
        draft: &state::OfferDraft,
        inbound: &InboundMessage,
        phone_key: &str,
        now: &str,
    ) {
        info!(
            conversation_id = conversation.id.as_str(),
            price = draft.price,
            currency = draft.currency.as_str(),
            "price offer detected"
        );

        let offer = PriceOffer {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            listing_id: conversation.listing_id.clone(),
            message_id: Some(message.id.clone()),
            user_id: conversation.user_id.clone(),
            offered_price: draft.price,
            currency: draft.currency.clone(),
            status: "pending".to_string(),
            notes: Some(format!(
                "Offre détectée automatiquement: {} {}",
                draft.price, draft.currency
            )),
            created_at: now.to_string(),
        };

        match self.storage.insert_price_offer(&offer).await {
            Ok(()) => {
                self.broadcast.publish(EngineEvent::PriceOfferDetected {
                    conversation_id: conversation.id.clone(),
                    listing_id: conversation.listing_id.clone(),
                    price: draft.price,
                    currency: draft.currency.clone(),
                    phone_key: phone_key.to_string(),
                    message_body: inbound.body.clone(),
                    timestamp: now.to_string(),
                });
            }
            Err(e) => warn!(
                conversation_id = conversation.id.as_str(),
                error = %e,
                "price offer not persisted"
            ),
        }
    }

    /// Generates, delays, dispatches, and persists the assistant reply.
    /// Returns whether a reply went out. Failures are logged and leave the
    /// inbound message recorded; the counterpart sees silence, never an
    /// error.
    async fn generate_and_send_reply(
        &self,
        conversation: &Conversation,
        message: &MessageRecord,
        inbound: &InboundMessage,
        settings: &AssistantSettings,
    ) -> bool {
        let history = self.load_history(conversation, message, settings).await;

        let reply_text = match self.assistant.generate_reply(&history, &inbound.body).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!("assistant returned an empty reply, staying silent");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "assistant failed, staying silent");
                return false;
            }
        };

        let wait = delay::response_delay(&reply_text, &settings.typing, conversation.demo);
        if !wait.is_zero() {
            info!(
                delay_ms = wait.as_millis() as u64,
                "applying human-like response delay"
            );
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.cancel.cancelled() => {
                    // Abandon cleanly: nothing dispatched, nothing persisted.
                    info!("shutdown during response delay, reply abandoned");
                    return false;
                }
            }
        }

        let external_id = match self
            .transport
            .send(OutboundMessage {
                recipient_id: inbound.sender_id.clone(),
                body: reply_text.clone(),
            })
            .await
        {
            Ok(id) => Some(id.0),
            Err(e) => {
                warn!(error = %e, "reply dispatch failed");
                return false;
            }
        };

        let now = time::now_millis();
        let reply_record = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            body: reply_text,
            is_from_me: true,
            external_id,
            timestamp: now.clone(),
            user_id: conversation.user_id.clone(),
            created_at: now.clone(),
        };

        if let Err(e) = self.storage.insert_message(&reply_record).await {
            error!(error = %e, "dispatched reply could not be persisted");
            return true;
        }
        if let Err(e) = self
            .storage
            .touch_last_message(&conversation.id, &now)
            .await
        {
            warn!(error = %e, "last-message timestamp update failed");
        }

        self.publish_message(conversation, &reply_record);
        true
    }

    /// Bounded conversation history for the assistant, oldest first,
    /// excluding the message being answered and empty bodies.
    async fn load_history(
        &self,
        conversation: &Conversation,
        current: &MessageRecord,
        settings: &AssistantSettings,
    ) -> Vec<ChatTurn> {
        let fetch_limit = settings.max_history as i64 + 1;
        let messages = match self
            .storage
            .get_messages(&conversation.id, Some(fetch_limit))
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "history load failed, replying without context");
                return Vec::new();
            }
        };

        let mut turns: Vec<ChatTurn> = messages
            .into_iter()
            .filter(|m| m.id != current.id && !m.body.trim().is_empty())
            .map(|m| ChatTurn {
                role: if m.is_from_me {
                    ChatRole::Assistant
                } else {
                    ChatRole::User
                },
                content: m.body,
            })
            .collect();

        if turns.len() > settings.max_history {
            let excess = turns.len() - settings.max_history;
            turns.drain(..excess);
        }
        turns
    }

    fn publish_message(&self, conversation: &Conversation, message: &MessageRecord) {
        self.broadcast.publish(EngineEvent::NewMessage {
            id: message.id.clone(),
            conversation_id: conversation.id.clone(),
            phone_key: conversation.phone_key.clone(),
            body: message.body.clone(),
            is_from_me: message.is_from_me,
            timestamp: message.timestamp.clone(),
        });
    }
}
