// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `velio serve` command implementation.
//!
//! Wires the full stack: SQLite storage, the WhatsApp transport (webhook
//! listener + bridge client), the assistant provider, the gateway HTTP
//! server with its WebSocket event feed, and the engine loop. Shuts down
//! gracefully on SIGINT/SIGTERM, draining in-flight conversation workers.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use velio_assistant::{HttpAssistant, SilentAssistant};
use velio_config::{SettingsHandle, VelioConfig};
use velio_core::{
    AssistantAdapter, BroadcastAdapter, StorageAdapter, TransportAdapter, VelioError,
};
use velio_engine::{EngineLoop, IngestPipeline, shutdown};
use velio_gateway::{EventBroadcaster, GatewayState};
use velio_storage::SqliteStorage;
use velio_whatsapp::WhatsAppTransport;

/// Runs the `velio serve` command until a shutdown signal arrives.
pub async fn run_serve(config: VelioConfig) -> Result<(), VelioError> {
    init_tracing(&config.agent.log_level);

    info!(name = config.agent.name.as_str(), "starting velio serve");

    // Storage.
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    // Runtime-reloadable assistant settings.
    let settings = SettingsHandle::from_config(&config);

    // Transport: webhook listener + bridge client.
    let mut transport = WhatsAppTransport::new(config.whatsapp.clone())?;
    transport.connect().await?;
    let transport: Arc<dyn TransportAdapter> = Arc::new(transport);

    // Assistant provider; without an API key the policy keeps the
    // assistant silent and this adapter is never exercised.
    let assistant: Arc<dyn AssistantAdapter> = if config.assistant.api_key.is_some() {
        Arc::new(HttpAssistant::new(&config.assistant, settings.clone())?)
    } else {
        warn!("assistant.api_key not set -- automated replies disabled");
        Arc::new(SilentAssistant)
    };

    // Event fan-out shared by the pipeline and the gateway.
    let events = EventBroadcaster::new();
    let broadcast: Arc<dyn BroadcastAdapter> = Arc::new(events.clone());

    let cancel = shutdown::install_signal_handler();

    let pipeline = IngestPipeline::new(
        Arc::clone(&storage),
        Arc::clone(&transport),
        assistant,
        broadcast,
        settings.clone(),
        cancel.clone(),
    );

    // Gateway HTTP server.
    let gateway_state = GatewayState {
        storage: Arc::clone(&storage),
        transport: Arc::clone(&transport),
        pipeline: Arc::clone(&pipeline),
        settings,
        events,
        start_time: Instant::now(),
    };
    let gateway_config = config.gateway.clone();
    tokio::spawn(async move {
        if let Err(e) = velio_gateway::start_server(&gateway_config, gateway_state).await {
            error!(error = %e, "gateway server terminated");
        }
    });

    // Engine loop: blocks until shutdown, then drains workers.
    let engine = EngineLoop::new(Arc::clone(&transport), pipeline);
    engine.run(cancel).await?;

    storage.close().await?;
    info!("velio stopped");
    Ok(())
}

/// Initializes the tracing subscriber from `RUST_LOG`, falling back to the
/// configured log level.
fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
