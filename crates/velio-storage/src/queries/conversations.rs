// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD and state-transition operations.

use std::str::FromStr;

use rusqlite::{Row, params};

use velio_core::VelioError;
use velio_core::types::{Conversation, ConversationState, StateChange};

use crate::database::Database;

const CONVERSATION_COLUMNS: &str = "id, phone_key, chat_id, listing_id, user_id, state, \
     state_changed_at, state_change_reason, detected_price, price_detected_at, \
     price_message_id, demo, last_message_at, created_at";

pub(crate) fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let state_str: String = row.get(5)?;
    let state = ConversationState::from_str(&state_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Conversation {
        id: row.get(0)?,
        phone_key: row.get(1)?,
        chat_id: row.get(2)?,
        listing_id: row.get(3)?,
        user_id: row.get(4)?,
        state,
        state_changed_at: row.get(6)?,
        state_change_reason: row.get(7)?,
        detected_price: row.get(8)?,
        price_detected_at: row.get(9)?,
        price_message_id: row.get(10)?,
        demo: row.get::<_, i64>(11)? != 0,
        last_message_at: row.get(12)?,
        created_at: row.get(13)?,
    })
}

/// Find the conversation for a canonical phone key, creating it if absent.
///
/// Creation is race-safe: an `INSERT OR IGNORE` against the unique
/// `phone_key` constraint followed by a re-select, so concurrent creation
/// attempts converge on one row. A newly created conversation is linked to
/// a listing whose phone contains the key, inheriting its owner.
pub async fn find_or_create(
    db: &Database,
    phone_key: &str,
    chat_id: Option<&str>,
    demo: bool,
    now: &str,
) -> Result<Conversation, VelioError> {
    let phone_key = phone_key.to_string();
    let chat_id = chat_id.map(str::to_string);
    let now = now.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();

    db.connection()
        .call(move |conn| {
            let select_sql =
                format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE phone_key = ?1");

            if let Some(existing) = conn
                .query_row(&select_sql, params![phone_key], row_to_conversation)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?
            {
                return Ok(existing);
            }

            // Link the new conversation to a listing advertised under this
            // number, inheriting its owning user.
            let listing: Option<(String, Option<String>)> = conn
                .query_row(
                    "SELECT id, user_id FROM listings
                     WHERE phone LIKE '%' || ?1 || '%' LIMIT 1",
                    params![phone_key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            let (listing_id, user_id) = match listing {
                Some((lid, uid)) => (Some(lid), uid),
                None => (None, None),
            };

            conn.execute(
                "INSERT OR IGNORE INTO conversations
                     (id, phone_key, chat_id, listing_id, user_id, state, demo,
                      last_message_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?7, ?7)",
                params![
                    new_id,
                    phone_key,
                    chat_id,
                    listing_id,
                    user_id,
                    demo as i64,
                    now
                ],
            )?;

            // Re-select: returns our row, or the one a concurrent writer won with.
            let conversation =
                conn.query_row(&select_sql, params![phone_key], row_to_conversation)?;
            Ok(conversation)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, VelioError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_conversation)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other.into()),
                })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_by_phone(
    db: &Database,
    phone_key: &str,
) -> Result<Option<Conversation>, VelioError> {
    let phone_key = phone_key.to_string();
    db.connection()
        .call(move |conn| {
            let sql =
                format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE phone_key = ?1");
            conn.query_row(&sql, params![phone_key], row_to_conversation)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other.into()),
                })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// One page of conversations, most recently contacted first, plus the total
/// row count. Pages are 1-based.
pub async fn list(
    db: &Database,
    page: u32,
    limit: u32,
) -> Result<(Vec<Conversation>, u64), VelioError> {
    let limit = i64::from(limit.max(1));
    let offset = i64::from(page.saturating_sub(1)) * limit;

    db.connection()
        .call(move |conn| {
            let total: u64 =
                conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| {
                    row.get::<_, i64>(0)
                })? as u64;

            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 ORDER BY last_message_at DESC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit, offset], row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok((conversations, total))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn touch_last_message(db: &Database, id: &str, at: &str) -> Result<(), VelioError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET last_message_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Applies an optimistic state change guarded on the expected current state.
///
/// Returns `false` when no row matched (the conversation changed state under
/// us or does not exist) -- the caller re-reads and decides.
pub async fn apply_state_change(db: &Database, change: &StateChange) -> Result<bool, VelioError> {
    let change = change.clone();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE conversations
                 SET state = ?3, state_changed_at = ?4, state_change_reason = ?5,
                     detected_price = ?6, price_detected_at = ?7, price_message_id = ?8
                 WHERE id = ?1 AND state = ?2",
                params![
                    change.conversation_id,
                    change.expected.to_string(),
                    change.next.to_string(),
                    change.at,
                    change.reason,
                    change.detected_price,
                    change.price_detected_at,
                    change.price_message_id,
                ],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Operator override: sets any state with an explicit reason, unconditionally.
pub async fn set_state(
    db: &Database,
    id: &str,
    state: ConversationState,
    reason: &str,
    at: &str,
) -> Result<Option<Conversation>, VelioError> {
    let id = id.to_string();
    let state = state.to_string();
    let reason = reason.to_string();
    let at = at.to_string();

    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE conversations
                 SET state = ?2, state_changed_at = ?3, state_change_reason = ?4
                 WHERE id = ?1",
                params![id, state, at, reason],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            let conversation = conn.query_row(&sql, params![id], row_to_conversation)?;
            Ok(Some(conversation))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Administrative reset: removes the conversation; messages and price offers
/// go with it via `ON DELETE CASCADE`.
pub async fn delete(db: &Database, id: &str) -> Result<bool, VelioError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(deleted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
