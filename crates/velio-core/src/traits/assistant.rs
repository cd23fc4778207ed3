// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant adapter trait for automated reply generation.

use async_trait::async_trait;

use crate::error::VelioError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatTurn;

/// Adapter for the reply-generating assistant collaborator.
///
/// The pipeline supplies bounded conversation history; the adapter owns the
/// provider call. A provider failure may be surfaced as an explicit fallback
/// reply string rather than an error -- the chat counterpart must never see
/// an internal error.
#[async_trait]
pub trait AssistantAdapter: PluginAdapter {
    /// Generates a reply to `message` given prior conversation `history`
    /// (oldest first).
    async fn generate_reply(
        &self,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, VelioError>;
}
