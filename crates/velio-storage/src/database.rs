// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: `Database` wraps a single `tokio_rusqlite::Connection`, every
//! query module accepts `&Database` and goes through `conn.call()`, which
//! eliminates SQLITE_BUSY errors under concurrent access.
//!
//! **Do NOT create additional Connection instances for writes.**

use tokio_rusqlite::Connection;
use tracing::debug;

use velio_core::VelioError;

use crate::migrations;

/// Handle to the SQLite database backing all Velio persistence.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at `path`, applies connection
    /// PRAGMAs, and runs any pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, VelioError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::from(e)))?;

        conn.call(move |conn| -> Result<(), VelioError> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(sqlite_storage_err)?;
                conn.pragma_update(None, "synchronous", "NORMAL")
                    .map_err(sqlite_storage_err)?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(sqlite_storage_err)?;
            conn.pragma_update(None, "busy_timeout", 5000)
                .map_err(sqlite_storage_err)?;

            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| VelioError::Storage {
            source: Box::new(e),
        })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the background connection thread.
    pub async fn close(&self) -> Result<(), VelioError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> VelioError {
    VelioError::Storage {
        source: Box::new(e),
    }
}

/// Map a rusqlite error into the workspace storage error type.
fn sqlite_storage_err(e: rusqlite::Error) -> VelioError {
    VelioError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_file_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> rusqlite::Result<Vec<String>> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut names = Vec::new();
                for row in rows {
                    names.push(row?);
                }
                Ok(names)
            })
            .await
            .unwrap();

        for expected in ["conversations", "messages", "price_offers", "listings"] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}, got {tables:?}"
            );
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent_across_restarts() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();

        let db = Database::open(path, true).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Second open must not re-apply migrations.
        let db = Database::open(path, true).await.unwrap();
        db.close().await.unwrap();
    }
}
