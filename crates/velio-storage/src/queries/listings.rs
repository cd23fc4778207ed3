// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listing lookups and contact-status updates.

use rusqlite::{Row, params};

use velio_core::VelioError;
use velio_core::types::Listing;

use crate::database::Database;

const LISTING_COLUMNS: &str =
    "id, phone, make, model, year, asking_price, contact_status, user_id, updated_at";

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        phone: row.get(1)?,
        make: row.get(2)?,
        model: row.get(3)?,
        year: row.get(4)?,
        asking_price: row.get(5)?,
        contact_status: row.get(6)?,
        user_id: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub async fn insert(db: &Database, listing: &Listing) -> Result<(), VelioError> {
    let listing = listing.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO listings
                     (id, phone, make, model, year, asking_price, contact_status,
                      user_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    listing.id,
                    listing.phone,
                    listing.make,
                    listing.model,
                    listing.year,
                    listing.asking_price,
                    listing.contact_status,
                    listing.user_id,
                    listing.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Finds a listing advertised under a phone number containing the canonical
/// key digits.
pub async fn find_by_phone(db: &Database, phone_key: &str) -> Result<Option<Listing>, VelioError> {
    let phone_key = phone_key.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {LISTING_COLUMNS} FROM listings
                 WHERE phone LIKE '%' || ?1 || '%' LIMIT 1"
            );
            conn.query_row(&sql, params![phone_key], row_to_listing)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other.into()),
                })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Listing>, VelioError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_listing)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other.into()),
                })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sets the listing contact status (`contacted`, `sold`, ...).
pub async fn set_contact_status(
    db: &Database,
    id: &str,
    status: &str,
    at: &str,
) -> Result<(), VelioError> {
    let id = id.to_string();
    let status = status.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE listings SET contact_status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
