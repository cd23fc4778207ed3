// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Velio sales assistant.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Velio workspace. All collaborator
//! adapters implement traits defined here.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VelioError;
pub use types::{
    AdapterType, Conversation, ConversationState, EngineEvent, HealthStatus, InboundMessage,
    Listing, MessageRecord, OutboundMessage, PriceOffer, StateChange, TransportStatus,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    AssistantAdapter, BroadcastAdapter, NoopBroadcast, PluginAdapter, StorageAdapter,
    TransportAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velio_error_has_all_variants() {
        let _config = VelioError::Config("test".into());
        let _storage = VelioError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _transport = VelioError::Transport {
            message: "test".into(),
            source: None,
        };
        let _assistant = VelioError::Assistant {
            message: "test".into(),
            source: None,
        };
        let _conflict = VelioError::Conflict {
            conversation_id: "c1".into(),
            expected: "active".into(),
        };
        let _not_found = VelioError::NotFound {
            kind: "conversation",
            id: "c1".into(),
        };
        let _timeout = VelioError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = VelioError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Transport,
            AdapterType::Assistant,
            AdapterType::Storage,
            AdapterType::Broadcast,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every adapter trait is reachable from the
        // crate root.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transport_adapter<T: TransportAdapter>() {}
        fn _assert_assistant_adapter<T: AssistantAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_broadcast_adapter<T: BroadcastAdapter>() {}
    }
}
