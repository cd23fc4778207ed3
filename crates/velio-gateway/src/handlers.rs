// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use velio_config::AssistantSettings;
use velio_core::types::{Conversation, Listing, MessageRecord, PriceOffer};
use velio_core::{ConversationState, InboundMessage, OutboundMessage, VelioError, time};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(e: VelioError) -> Response {
    error!(error = %e, "gateway request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn not_found(kind: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{kind} not found: {id}"),
        }),
    )
        .into_response()
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// --- Conversations ---

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub listing: Option<Listing>,
    pub last_message: Option<MessageRecord>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub pagination: Pagination,
}

/// GET /v1/conversations?page=&limit=
pub async fn list_conversations(
    State(state): State<GatewayState>,
    Query(params): Query<PageParams>,
) -> Response {
    let limit = params.limit.clamp(1, 100);
    let (conversations, total) = match state.storage.list_conversations(params.page, limit).await {
        Ok(page) => page,
        Err(e) => return internal_error(e),
    };

    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let summary = match summarize(&state, conversation).await {
            Ok(summary) => summary,
            Err(e) => return internal_error(e),
        };
        summaries.push(summary);
    }

    let total_pages = total.div_ceil(u64::from(limit));
    Json(ConversationListResponse {
        conversations: summaries,
        pagination: Pagination {
            page: params.page,
            limit,
            total,
            total_pages,
        },
    })
    .into_response()
}

async fn summarize(
    state: &GatewayState,
    conversation: Conversation,
) -> Result<ConversationSummary, VelioError> {
    let listing = match conversation.listing_id.as_deref() {
        Some(listing_id) => state.storage.get_listing(listing_id).await?,
        None => None,
    };
    // The most recent message: limited fetch returns the newest window.
    let last_message = state
        .storage
        .get_messages(&conversation.id, Some(1))
        .await?
        .pop();
    Ok(ConversationSummary {
        conversation,
        listing,
        last_message,
    })
}

/// GET /v1/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.storage.get_conversation(&id).await {
        Ok(Some(conversation)) => match summarize(&state, conversation).await {
            Ok(summary) => Json(summary).into_response(),
            Err(e) => internal_error(e),
        },
        Ok(None) => not_found("conversation", &id),
        Err(e) => internal_error(e),
    }
}

/// GET /v1/conversations/{id}/messages
pub async fn get_conversation_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.storage.get_conversation(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("conversation", &id),
        Err(e) => return internal_error(e),
    }
    match state.storage.get_messages(&id, None).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /v1/conversations/{id}/offers
pub async fn get_conversation_offers(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.storage.list_price_offers(&id).await {
        Ok(offers) => Json::<Vec<PriceOffer>>(offers).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatePatch {
    pub state: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// PATCH /v1/conversations/{id}/state
///
/// Operator override: any state can be set with an explicit reason. This is
/// the only way out of `negotiation`, `completed`, or `archived`.
pub async fn patch_conversation_state(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(patch): Json<StatePatch>,
) -> Response {
    let Ok(next) = ConversationState::from_str(&patch.state) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: format!(
                    "invalid state `{}` (expected active, negotiation, completed, archived)",
                    patch.state
                ),
            }),
        )
            .into_response();
    };

    let reason = patch.reason.unwrap_or_else(|| "Manual update".to_string());
    let now = time::now_millis();
    match state
        .storage
        .set_conversation_state(&id, next, &reason, &now)
        .await
    {
        Ok(Some(conversation)) => Json(conversation).into_response(),
        Ok(None) => not_found("conversation", &id),
        Err(e) => internal_error(e),
    }
}

/// DELETE /v1/conversations/{id}
///
/// Administrative reset; cascades to messages and price offers.
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.storage.delete_conversation(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("conversation", &id),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub removed: usize,
}

/// POST /v1/conversations/{id}/sweep
///
/// On-demand duplicate sweep (safety net behind the ingestion-time check).
pub async fn sweep_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.pipeline.sweep_duplicates(&id).await {
        Ok(removed) => Json(SweepResponse { removed }).into_response(),
        Err(e) => internal_error(e),
    }
}

// --- Operator send ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub number: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message_id: String,
    pub conversation_id: String,
}

/// POST /v1/messages
///
/// Sends a message from the operator through the transport, then ingests it
/// as an outbound-observed message so it lands in history and observers see
/// it.
pub async fn post_message(
    State(state): State<GatewayState>,
    Json(body): Json<SendMessageRequest>,
) -> Response {
    if body.number.trim().is_empty() || body.body.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "number and body are required".to_string(),
            }),
        )
            .into_response();
    }

    let external_id = match state
        .transport
        .send(OutboundMessage {
            recipient_id: body.number.clone(),
            body: body.body.clone(),
        })
        .await
    {
        Ok(id) => id.0,
        Err(e) => return internal_error(e),
    };

    let inbound = InboundMessage {
        sender_id: body.number,
        body: body.body,
        timestamp: time::now_millis(),
        external_id: Some(external_id.clone()),
        is_from_me: true,
    };

    match state.pipeline.handle_message(inbound).await {
        Ok(outcome) => {
            let conversation_id = match outcome {
                velio_engine::IngestOutcome::Persisted {
                    conversation_id, ..
                }
                | velio_engine::IngestOutcome::Duplicate { conversation_id } => conversation_id,
            };
            Json(SendMessageResponse {
                success: true,
                message_id: external_id,
                conversation_id,
            })
            .into_response()
        }
        Err(e) => internal_error(e),
    }
}

// --- Assistant settings ---

/// GET /v1/assistant/config
pub async fn get_assistant_config(State(state): State<GatewayState>) -> Json<AssistantSettings> {
    Json(state.settings.current().as_ref().clone())
}

/// PUT /v1/assistant/config
///
/// The explicit update contract: the whole settings value is replaced
/// atomically; the next processed message sees the new snapshot.
pub async fn put_assistant_config(
    State(state): State<GatewayState>,
    Json(settings): Json<AssistantSettings>,
) -> Response {
    state.settings.update(settings);
    Json(state.settings.current().as_ref().clone()).into_response()
}

// --- Listings ---

#[derive(Debug, Deserialize)]
pub struct ListingStatusPatch {
    pub status: String,
}

/// PATCH /v1/listings/{id}/status
///
/// Operator action on the listing (e.g. marking it `sold` after an
/// unavailability signal). The engine never sets `sold` on its own.
pub async fn patch_listing_status(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(patch): Json<ListingStatusPatch>,
) -> Response {
    match state.storage.get_listing(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("listing", &id),
        Err(e) => return internal_error(e),
    }

    let now = time::now_millis();
    match state
        .storage
        .set_listing_contact_status(&id, &patch.status, &now)
        .await
    {
        Ok(()) => match state.storage.get_listing(&id).await {
            Ok(Some(listing)) => Json(listing).into_response(),
            Ok(None) => not_found("listing", &id),
            Err(e) => internal_error(e),
        },
        Err(e) => internal_error(e),
    }
}

// --- Transport ---

#[derive(Debug, Serialize)]
pub struct TransportStatusResponse {
    pub status: velio_core::TransportStatus,
}

/// GET /v1/transport/status
pub async fn get_transport_status(State(state): State<GatewayState>) -> Response {
    Json(TransportStatusResponse {
        status: state.transport.status(),
    })
    .into_response()
}

#[derive(Debug, Serialize)]
pub struct PairingResponse {
    pub pairing_code: String,
}

/// GET /v1/transport/pairing
pub async fn get_transport_pairing(State(state): State<GatewayState>) -> Response {
    match state.transport.pairing_code() {
        Some(code) => Json(PairingResponse { pairing_code: code }).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "pairing code not available".to_string(),
            }),
        )
            .into_response(),
    }
}
