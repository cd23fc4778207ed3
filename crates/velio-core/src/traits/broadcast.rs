// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast trait for fire-and-forget event notification.

use crate::types::EngineEvent;

/// Sink for engine events consumed by UI-facing observers.
///
/// Delivery is fire-and-forget, at-least-once, with no ordering guarantee
/// beyond "inbound before outbound-reply for the same exchange" (which the
/// pipeline provides by publishing in that order). A publish must never
/// block or fail the ingestion pipeline.
pub trait BroadcastAdapter: Send + Sync + 'static {
    fn publish(&self, event: EngineEvent);
}

/// Broadcast sink that drops every event. Used in tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcast;

impl BroadcastAdapter for NoopBroadcast {
    fn publish(&self, _event: EngineEvent) {}
}
