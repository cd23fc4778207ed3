// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplicate suppression for inbound messages.
//!
//! The transport may redeliver a message without a stable id, and the live
//! event path and historical backfill can observe the same human message
//! independently. Suppression runs before insertion: an exact external-id
//! match short-circuits unconditionally (idempotent replay), otherwise two
//! messages with the same conversation, body, and direction whose event
//! times fall within 10 seconds of each other are the same logical event.
//!
//! A best-effort sweep removes duplicates that made it into storage anyway,
//! keeping the earliest record of each group and never re-sending the side
//! effects of the removed ones.

use std::collections::HashSet;

use tracing::{debug, info};

use velio_core::{StorageAdapter, VelioError, time};

/// Symmetric duplicate window, in seconds.
pub const DUPLICATE_WINDOW_SECS: i64 = 10;

/// Decides whether a candidate message is a re-delivery of a stored one.
///
/// Checked before insertion, not as post-hoc cleanup, so the duplicate
/// never acquires side effects.
pub async fn is_duplicate(
    storage: &dyn StorageAdapter,
    conversation_id: &str,
    body: &str,
    is_from_me: bool,
    timestamp: &str,
    external_id: Option<&str>,
) -> Result<bool, VelioError> {
    if let Some(external_id) = external_id
        && storage
            .find_message_by_external_id(conversation_id, external_id)
            .await?
            .is_some()
    {
        debug!(conversation_id, external_id, "duplicate by external id");
        return Ok(true);
    }

    let (from, to) =
        time::window_bounds(timestamp, DUPLICATE_WINDOW_SECS).ok_or_else(|| {
            VelioError::Internal(format!("unparseable message timestamp: {timestamp}"))
        })?;

    let similar = storage
        .find_similar_message(conversation_id, body, is_from_me, &from, &to)
        .await?;

    if let Some(ref existing) = similar {
        debug!(
            conversation_id,
            existing_id = existing.id.as_str(),
            "duplicate by content window"
        );
    }
    Ok(similar.is_some())
}

/// Removes already-stored duplicates in one conversation.
///
/// Messages are grouped by `(body, direction, 10-second timestamp bucket)`;
/// the earliest record of each group is kept, the rest are deleted. Returns
/// the number of removed rows.
pub async fn sweep_conversation(
    storage: &dyn StorageAdapter,
    conversation_id: &str,
) -> Result<usize, VelioError> {
    // Oldest-first ordering makes "first seen" the earliest timestamp.
    let messages = storage.get_messages(conversation_id, None).await?;

    let mut seen: HashSet<(String, bool, i64)> = HashSet::new();
    let mut doomed: Vec<String> = Vec::new();

    for msg in &messages {
        let bucket = time::epoch_millis(&msg.timestamp).ok_or_else(|| {
            VelioError::Internal(format!("unparseable stored timestamp: {}", msg.timestamp))
        })? / (DUPLICATE_WINDOW_SECS * 1000);

        if !seen.insert((msg.body.clone(), msg.is_from_me, bucket)) {
            doomed.push(msg.id.clone());
        }
    }

    if doomed.is_empty() {
        return Ok(0);
    }

    let removed = storage.delete_messages(&doomed).await?;
    info!(conversation_id, removed, "duplicate sweep complete");
    Ok(removed)
}
