// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete ingestion stack -- temp SQLite
//! storage, mock transport and assistant, an event-collecting broadcast --
//! and drives the pipeline synchronously via `ingest_text()` so tests stay
//! deterministic.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use velio_config::{AssistantSettings, SettingsHandle, VelioConfig};
use velio_config::model::StorageConfig;
use velio_core::{
    BroadcastAdapter, EngineEvent, InboundMessage, StorageAdapter, VelioError, time,
};
use velio_engine::{IngestOutcome, IngestPipeline};
use velio_storage::SqliteStorage;

use crate::mock_assistant::MockAssistant;
use crate::mock_transport::MockTransport;

/// Broadcast sink that records every published event for assertions.
#[derive(Default)]
pub struct CollectingBroadcast {
    events: Mutex<Vec<EngineEvent>>,
}

impl CollectingBroadcast {
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

impl BroadcastAdapter for CollectingBroadcast {
    fn publish(&self, event: EngineEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    settings: AssistantSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        // Tests default to an enabled assistant with instant replies.
        let mut settings = AssistantSettings::from_config(&VelioConfig::default());
        settings.enabled = true;
        settings.typing.enabled = false;
        Self {
            responses: Vec::new(),
            settings,
        }
    }

    /// Set scripted assistant responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Override the trigger keywords.
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.settings.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_respond_to_all(mut self, respond_to_all: bool) -> Self {
        self.settings.respond_to_all = respond_to_all;
        self
    }

    pub fn with_pause_on_price_offer(mut self, pause: bool) -> Self {
        self.settings.pause_on_price_offer = pause;
        self
    }

    /// Mark contact numbers as demo/sandbox.
    pub fn with_demo_numbers(mut self, numbers: &[&str]) -> Self {
        self.settings.demo_numbers = numbers.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, VelioError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| VelioError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let transport = Arc::new(MockTransport::new());
        let assistant = Arc::new(MockAssistant::with_responses(self.responses));
        let broadcast = Arc::new(CollectingBroadcast::default());
        let settings = SettingsHandle::new(self.settings);
        let cancel = CancellationToken::new();

        let pipeline = IngestPipeline::new(
            Arc::clone(&storage),
            transport.clone(),
            assistant.clone(),
            broadcast.clone(),
            settings.clone(),
            cancel.clone(),
        );

        Ok(TestHarness {
            storage,
            transport,
            assistant,
            broadcast,
            settings,
            pipeline,
            cancel,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete ingestion stack over temp SQLite and mock collaborators.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    pub transport: Arc<MockTransport>,
    pub assistant: Arc<MockAssistant>,
    pub broadcast: Arc<CollectingBroadcast>,
    pub settings: SettingsHandle,
    pub pipeline: Arc<IngestPipeline>,
    pub cancel: CancellationToken,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one inbound text through the full pipeline, with a fresh
    /// external id and the current time.
    pub async fn ingest_text(
        &self,
        from: &str,
        body: &str,
    ) -> Result<IngestOutcome, VelioError> {
        self.ingest(InboundMessage {
            sender_id: from.to_string(),
            body: body.to_string(),
            timestamp: time::now_millis(),
            external_id: Some(format!("ext-{}", uuid::Uuid::new_v4())),
            is_from_me: false,
        })
        .await
    }

    /// Runs an exact inbound event through the full pipeline.
    pub async fn ingest(&self, inbound: InboundMessage) -> Result<IngestOutcome, VelioError> {
        self.pipeline.handle_message(inbound).await
    }
}
