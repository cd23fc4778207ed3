// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime-reloadable assistant settings.
//!
//! The ingestion pipeline and state machine read behavior flags on every
//! message. Instead of ambient mutable globals, the live settings are held
//! in an [`arc_swap::ArcSwap`] behind a cheaply clonable [`SettingsHandle`]
//! with an explicit `update()`/`reload()` contract: readers get a consistent
//! snapshot via `current()`, writers replace the whole value atomically.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::model::{TypingConfig, VelioConfig};

/// The subset of configuration the pipeline consults per message.
///
/// Updatable at runtime through the gateway; a snapshot is taken once per
/// processed message so a reload mid-message cannot produce a torn read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantSettings {
    pub enabled: bool,
    pub respond_to_all: bool,
    pub keywords: Vec<String>,
    pub system_prompt: String,
    pub max_history: usize,
    pub typing: TypingConfig,
    pub pause_on_price_offer: bool,
    pub unavailability_keywords: Vec<String>,
    pub demo_numbers: Vec<String>,
}

impl AssistantSettings {
    /// Extract the runtime settings from a full configuration.
    pub fn from_config(config: &VelioConfig) -> Self {
        Self {
            enabled: config.assistant.enabled && config.assistant.api_key.is_some(),
            respond_to_all: config.assistant.respond_to_all,
            keywords: config.assistant.keywords.clone(),
            system_prompt: config.assistant.system_prompt.clone(),
            max_history: config.assistant.max_history,
            typing: config.typing.clone(),
            pause_on_price_offer: config.detection.pause_on_price_offer,
            unavailability_keywords: config.detection.unavailability_keywords.clone(),
            demo_numbers: config.detection.demo_numbers.clone(),
        }
    }
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self::from_config(&VelioConfig::default())
    }
}

/// Shared handle to the live [`AssistantSettings`].
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<ArcSwap<AssistantSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: AssistantSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    pub fn from_config(config: &VelioConfig) -> Self {
        Self::new(AssistantSettings::from_config(config))
    }

    /// Returns the current settings snapshot.
    pub fn current(&self) -> Arc<AssistantSettings> {
        self.inner.load_full()
    }

    /// Replaces the live settings atomically.
    pub fn update(&self, settings: AssistantSettings) {
        tracing::info!(
            enabled = settings.enabled,
            respond_to_all = settings.respond_to_all,
            keywords = settings.keywords.len(),
            "assistant settings updated"
        );
        self.inner.store(Arc::new(settings));
    }

    /// Re-derives the live settings from a freshly loaded configuration.
    pub fn reload(&self, config: &VelioConfig) {
        self.update(AssistantSettings::from_config(config));
    }
}

impl std::fmt::Debug for SettingsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsHandle")
            .field("current", &self.inner.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_requires_api_key() {
        let mut config = VelioConfig::default();
        config.assistant.enabled = true;
        config.assistant.api_key = None;
        assert!(!AssistantSettings::from_config(&config).enabled);

        config.assistant.api_key = Some("key".into());
        assert!(AssistantSettings::from_config(&config).enabled);
    }

    #[test]
    fn update_is_visible_to_other_clones() {
        let handle = SettingsHandle::from_config(&VelioConfig::default());
        let reader = handle.clone();

        let mut settings = AssistantSettings::default();
        settings.respond_to_all = true;
        handle.update(settings);

        assert!(reader.current().respond_to_all);
    }

    #[test]
    fn snapshot_is_stable_across_updates() {
        let handle = SettingsHandle::from_config(&VelioConfig::default());
        let snapshot = handle.current();
        let before = snapshot.respond_to_all;

        let mut settings = AssistantSettings::default();
        settings.respond_to_all = !before;
        handle.update(settings);

        // The previously taken snapshot is unchanged.
        assert_eq!(snapshot.respond_to_all, before);
    }
}
