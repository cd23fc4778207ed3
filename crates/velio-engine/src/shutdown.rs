// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shutdown signal wiring.
//!
//! SIGINT and SIGTERM cancel a shared [`CancellationToken`]. The engine
//! loop stops accepting transport events on cancellation and the
//! conversation workers finish (or cleanly abandon) the message in flight
//! before the process exits.

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Spawns the signal watcher and returns the token it will cancel.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(watch_signals(token.clone()));
    token
}

async fn watch_signals(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                // Without a SIGTERM stream, fall back to Ctrl+C only.
                error!(error = %e, "SIGTERM handler unavailable");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("SIGINT received, shutting down");
                    token.cancel();
                }
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("Ctrl+C handler unavailable, shutdown signal lost");
            return;
        }
        info!("Ctrl+C received, shutting down");
    }

    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_starts_uncancelled() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        // Cancel manually so the watcher task does not outlive the test.
        token.cancel();
    }
}
