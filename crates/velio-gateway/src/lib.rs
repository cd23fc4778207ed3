// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP control surface and WebSocket event feed for Velio.
//!
//! Thin CRUD wrappers over the storage adapter (conversations, messages,
//! price offers, manual state overrides), the runtime assistant-settings
//! update contract, transport status/pairing passthrough, and the
//! fire-and-forget event broadcast consumed by UI clients.

pub mod auth;
pub mod broadcast;
pub mod handlers;
pub mod server;
pub mod ws;

pub use broadcast::EventBroadcaster;
pub use server::{GatewayState, build_router, start_server};
