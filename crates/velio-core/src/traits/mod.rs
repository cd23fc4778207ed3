// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Velio collaborators.

pub mod adapter;
pub mod assistant;
pub mod broadcast;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use assistant::AssistantAdapter;
pub use broadcast::{BroadcastAdapter, NoopBroadcast};
pub use storage::StorageAdapter;
pub use transport::TransportAdapter;
