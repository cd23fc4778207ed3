// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Velio sales assistant.

use thiserror::Error;

/// The primary error type used across all Velio adapter traits and core operations.
#[derive(Debug, Error)]
pub enum VelioError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport adapter errors (webhook decode, send failure, signature mismatch).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Assistant provider errors (API failure, malformed completion).
    #[error("assistant error: {message}")]
    Assistant {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A state transition lost the race against a concurrent update and could
    /// not be applied even after a fresh re-read.
    #[error("conflicting update on conversation {conversation_id}: expected state {expected}")]
    Conflict {
        conversation_id: String,
        expected: String,
    },

    /// The referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
