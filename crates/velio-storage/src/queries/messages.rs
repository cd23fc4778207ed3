// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.
//!
//! Messages are always read back in `timestamp` order so that late-arriving
//! history backfills sort correctly regardless of insertion order.

use rusqlite::{Row, params};

use velio_core::VelioError;
use velio_core::types::MessageRecord;

use crate::database::Database;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, body, is_from_me, external_id, timestamp, user_id, created_at";

pub(crate) fn row_to_message(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        body: row.get(2)?,
        is_from_me: row.get::<_, i64>(3)? != 0,
        external_id: row.get(4)?,
        timestamp: row.get(5)?,
        user_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Insert a new message.
pub async fn insert(db: &Database, msg: &MessageRecord) -> Result<(), VelioError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages
                     (id, conversation_id, body, is_from_me, external_id, timestamp,
                      user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.body,
                    msg.is_from_me as i64,
                    msg.external_id,
                    msg.timestamp,
                    msg.user_id,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages for a conversation in event-time order (oldest first).
pub async fn get_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<MessageRecord>, VelioError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    // Window of the most recent messages, returned oldest-first.
                    let sql = format!(
                        "SELECT {MESSAGE_COLUMNS} FROM (
                             SELECT {MESSAGE_COLUMNS} FROM messages
                             WHERE conversation_id = ?1
                             ORDER BY timestamp DESC LIMIT ?2
                         ) ORDER BY timestamp ASC"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows =
                        stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let sql = format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY timestamp ASC"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Exact-match idempotency lookup by transport message id.
pub async fn find_by_external_id(
    db: &Database,
    conversation_id: &str,
    external_id: &str,
) -> Result<Option<MessageRecord>, VelioError> {
    let conversation_id = conversation_id.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 AND external_id = ?2 LIMIT 1"
            );
            conn.query_row(&sql, params![conversation_id, external_id], row_to_message)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other.into()),
                })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fuzzy duplicate lookup: same body and direction inside an inclusive
/// timestamp window. Bounds are RFC 3339 strings in the canonical millisecond
/// format, so lexicographic comparison matches chronological order.
pub async fn find_similar(
    db: &Database,
    conversation_id: &str,
    body: &str,
    is_from_me: bool,
    from: &str,
    to: &str,
) -> Result<Option<MessageRecord>, VelioError> {
    let conversation_id = conversation_id.to_string();
    let body = body.to_string();
    let from = from.to_string();
    let to = to.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 AND body = ?2 AND is_from_me = ?3
                   AND timestamp >= ?4 AND timestamp <= ?5
                 LIMIT 1"
            );
            conn.query_row(
                &sql,
                params![conversation_id, body, is_from_me as i64, from, to],
                row_to_message,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other.into()),
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bulk delete by id; returns the number of rows removed.
pub async fn delete_by_ids(db: &Database, ids: &[String]) -> Result<usize, VelioError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = std::iter::repeat_n("?", ids.len())
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("DELETE FROM messages WHERE id IN ({placeholders})");
            let deleted =
                conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
            Ok(deleted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
