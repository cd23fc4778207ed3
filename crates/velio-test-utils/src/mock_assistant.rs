// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock assistant adapter with scripted replies.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use velio_core::types::ChatTurn;
use velio_core::{
    AdapterType, AssistantAdapter, HealthStatus, PluginAdapter, VelioError,
};

/// Scripted assistant: returns queued responses in order, then a default
/// reply once the script runs dry. Records the history lengths it was
/// handed so tests can assert on context assembly.
pub struct MockAssistant {
    responses: Mutex<VecDeque<String>>,
    seen_history_lens: Mutex<Vec<usize>>,
    fail: Mutex<bool>,
}

impl MockAssistant {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            seen_history_lens: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        }
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        let assistant = Self::new();
        *assistant.responses.lock().expect("responses lock") = responses.into();
        assistant
    }

    /// Make every subsequent call fail with an assistant error.
    pub fn fail_replies(&self, fail: bool) {
        *self.fail.lock().expect("fail lock") = fail;
    }

    /// History lengths observed per call, in order.
    pub fn seen_history_lens(&self) -> Vec<usize> {
        self.seen_history_lens.lock().expect("history lock").clone()
    }
}

impl Default for MockAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockAssistant {
    fn name(&self) -> &str {
        "mock-assistant"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    async fn health_check(&self) -> Result<HealthStatus, VelioError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VelioError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for MockAssistant {
    async fn generate_reply(
        &self,
        history: &[ChatTurn],
        _message: &str,
    ) -> Result<String, VelioError> {
        self.seen_history_lens
            .lock()
            .expect("history lock")
            .push(history.len());

        if *self.fail.lock().expect("fail lock") {
            return Err(VelioError::Assistant {
                message: "mock assistant failure".to_string(),
                source: None,
            });
        }

        let scripted = self.responses.lock().expect("responses lock").pop_front();
        Ok(scripted.unwrap_or_else(|| "Merci pour votre message !".to_string()))
    }
}
