// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast sink backed by a tokio broadcast channel.
//!
//! The ingestion pipeline publishes events here; every connected WebSocket
//! client holds a subscriber. Publishing never blocks and never fails the
//! pipeline -- with no subscribers the event is simply dropped.

use tokio::sync::broadcast;
use tracing::trace;

use velio_core::{BroadcastAdapter, EngineEvent};

/// Default fan-out buffer per subscriber.
const EVENT_BUFFER: usize = 256;

/// Fire-and-forget event fan-out to WebSocket subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    /// New subscription for a WebSocket connection.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<EngineEvent> {
        self.sender.clone()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastAdapter for EventBroadcaster {
    fn publish(&self, event: EngineEvent) {
        // send() errs only when there are no subscribers; that is fine.
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(delivered, "event published");
    }
}
