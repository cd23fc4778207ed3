// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Price-offer persistence.
//!
//! Rows are written by the ingestion pipeline when the detector fires and
//! policy allows recording; the downstream negotiation workflow may update
//! `status` but this core never mutates a stored offer.

use rusqlite::{Row, params};

use velio_core::VelioError;
use velio_core::types::PriceOffer;

use crate::database::Database;

const OFFER_COLUMNS: &str = "id, conversation_id, listing_id, message_id, user_id, \
     offered_price, currency, status, notes, created_at";

fn row_to_offer(row: &Row<'_>) -> rusqlite::Result<PriceOffer> {
    Ok(PriceOffer {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        listing_id: row.get(2)?,
        message_id: row.get(3)?,
        user_id: row.get(4)?,
        offered_price: row.get(5)?,
        currency: row.get(6)?,
        status: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub async fn insert(db: &Database, offer: &PriceOffer) -> Result<(), VelioError> {
    let offer = offer.clone();
    db.connection()
        .call(move |conn| {
            // A message_id referencing a row that was never persisted (e.g. a
            // suppressed duplicate) must not break the offer: store NULL.
            let message_id: Option<String> = match offer.message_id {
                Some(ref mid) => {
                    let exists: bool = conn.query_row(
                        "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1)",
                        params![mid],
                        |row| row.get(0),
                    )?;
                    exists.then(|| mid.clone())
                }
                None => None,
            };

            conn.execute(
                "INSERT INTO price_offers
                     (id, conversation_id, listing_id, message_id, user_id,
                      offered_price, currency, status, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    offer.id,
                    offer.conversation_id,
                    offer.listing_id,
                    message_id,
                    offer.user_id,
                    offer.offered_price,
                    offer.currency,
                    offer.status,
                    offer.notes,
                    offer.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<PriceOffer>, VelioError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {OFFER_COLUMNS} FROM price_offers
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![conversation_id], row_to_offer)?;
            let mut offers = Vec::new();
            for row in rows {
                offers.push(row?);
            }
            Ok(offers)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
