// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The gateway is a thin CRUD
//! wrapper over the storage adapter plus the WebSocket event feed; all
//! decision logic stays in the engine.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::cors::CorsLayer;
use tracing::warn;

use velio_config::SettingsHandle;
use velio_config::model::GatewayConfig;
use velio_core::{StorageAdapter, TransportAdapter, VelioError};
use velio_engine::IngestPipeline;

use crate::auth::{AuthConfig, auth_middleware};
use crate::broadcast::EventBroadcaster;
use crate::{handlers, ws};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub storage: Arc<dyn StorageAdapter>,
    pub transport: Arc<dyn TransportAdapter>,
    pub pipeline: Arc<IngestPipeline>,
    pub settings: SettingsHandle,
    pub events: EventBroadcaster,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Builds the full gateway router.
///
/// - `/health` is public (liveness probes).
/// - `/v1/*` requires the bearer token when one is configured.
/// - `/ws` is the event feed; like the public routes it carries no
///   mutations.
pub fn build_router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/conversations", get(handlers::list_conversations))
        .route("/v1/conversations/{id}", get(handlers::get_conversation))
        .route(
            "/v1/conversations/{id}",
            delete(handlers::delete_conversation),
        )
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_conversation_messages),
        )
        .route(
            "/v1/conversations/{id}/offers",
            get(handlers::get_conversation_offers),
        )
        .route(
            "/v1/conversations/{id}/state",
            patch(handlers::patch_conversation_state),
        )
        .route(
            "/v1/conversations/{id}/sweep",
            post(handlers::sweep_conversation),
        )
        .route("/v1/messages", post(handlers::post_message))
        .route(
            "/v1/listings/{id}/status",
            patch(handlers::patch_listing_status),
        )
        .route("/v1/assistant/config", get(handlers::get_assistant_config))
        .route("/v1/assistant/config", put(handlers::put_assistant_config))
        .route("/v1/transport/status", get(handlers::get_transport_status))
        .route("/v1/transport/pairing", get(handlers::get_transport_pairing))
        .route_layer(axum_middleware::from_fn_with_state(
            auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    if auth.bearer_token.is_none() {
        warn!("gateway bearer token not configured -- /v1 API is open");
    }

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Binds and serves the gateway until the process exits.
pub async fn start_server(config: &GatewayConfig, state: GatewayState) -> Result<(), VelioError> {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    let app = build_router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| VelioError::Transport {
                message: format!("failed to bind gateway to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| VelioError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
