// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-respond policy.
//!
//! Decides whether an inbound message qualifies for an automated reply at
//! all. The pipeline combines this with the post-transition conversation
//! state: a price-triggered move to negotiation suppresses the reply for
//! that same message.

use velio_config::AssistantSettings;

/// Returns true when the assistant should generate a reply to `text`.
///
/// False unconditionally when the assistant is disabled; true
/// unconditionally when `respond_to_all` is set; otherwise a
/// case-insensitive substring match against the configured trigger keywords.
pub fn should_auto_respond(text: &str, settings: &AssistantSettings) -> bool {
    if !settings.enabled {
        return false;
    }
    if settings.respond_to_all {
        return true;
    }

    let lowercase = text.to_lowercase();
    settings.keywords.iter().any(|keyword| {
        let keyword = keyword.trim().to_lowercase();
        !keyword.is_empty() && lowercase.contains(&keyword)
    })
}
