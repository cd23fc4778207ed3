// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters and test harness for Velio integration tests.
//!
//! - [`MockTransport`]: injectable inbound queue, captured outbound sends
//! - [`MockAssistant`]: scripted replies with failure injection
//! - [`TestHarness`]: full ingestion stack over temp SQLite

pub mod harness;
pub mod mock_assistant;
pub mod mock_transport;

pub use harness::{CollectingBroadcast, TestHarness, TestHarnessBuilder};
pub use mock_assistant::MockAssistant;
pub use mock_transport::MockTransport;
