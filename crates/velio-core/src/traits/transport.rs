// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for chat platform integrations (WhatsApp, etc.).

use async_trait::async_trait;

use crate::error::VelioError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ExternalMessageId, InboundMessage, OutboundMessage, TransportStatus};

/// Adapter for bidirectional chat transport integrations.
///
/// Transport adapters connect Velio to the external messaging platform,
/// handling message ingestion and delivery. Retry of transient delivery
/// failures belongs to the transport, not to the ingestion pipeline.
#[async_trait]
pub trait TransportAdapter: PluginAdapter {
    /// Establishes the connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), VelioError>;

    /// Sends a message through the transport, returning the id the
    /// platform assigned to it.
    async fn send(&self, msg: OutboundMessage) -> Result<ExternalMessageId, VelioError>;

    /// Receives the next inbound message event from the transport.
    async fn receive(&self) -> Result<InboundMessage, VelioError>;

    /// Current connection status.
    fn status(&self) -> TransportStatus;

    /// Latest pairing code / QR payload, when the platform is waiting for
    /// the operator to pair a device. Opaque to the pipeline.
    fn pairing_code(&self) -> Option<String>;
}
