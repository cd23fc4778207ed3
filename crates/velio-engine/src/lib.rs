// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline, state machine, and detection logic for Velio.
//!
//! The [`EngineLoop`] is the central coordinator that:
//! - Receives message events from the transport adapter
//! - Routes them onto per-conversation worker queues
//! - Runs each message through the [`IngestPipeline`]
//! - Handles graceful shutdown, draining workers before exit

pub mod dedupe;
pub mod delay;
pub mod phone;
pub mod pipeline;
pub mod policy;
pub mod price;
pub mod shutdown;
pub mod signals;
pub mod state;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use velio_core::{TransportAdapter, VelioError};

pub use pipeline::{IngestOutcome, IngestPipeline};
pub use price::PriceSignal;

/// The main engine loop bridging the transport to the ingestion pipeline.
pub struct EngineLoop {
    transport: Arc<dyn TransportAdapter>,
    pipeline: Arc<IngestPipeline>,
}

impl EngineLoop {
    pub fn new(transport: Arc<dyn TransportAdapter>, pipeline: Arc<IngestPipeline>) -> Self {
        Self { transport, pipeline }
    }

    /// Runs until the cancellation token fires, then drains the pipeline.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), VelioError> {
        info!("engine loop running");
        self.pipeline.publish_transport_status(self.transport.status());

        loop {
            tokio::select! {
                msg = self.transport.receive() => {
                    match msg {
                        Ok(inbound) => self.pipeline.dispatch(inbound).await,
                        Err(e) => {
                            error!(error = %e, "transport receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping engine loop");
                    break;
                }
            }
        }

        self.pipeline.drain().await;
        info!("engine loop stopped");
        Ok(())
    }
}
