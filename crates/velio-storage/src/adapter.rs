// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use velio_config::model::StorageConfig;
use velio_core::types::{
    Conversation, ConversationState, Listing, MessageRecord, PriceOffer, StateChange,
};
use velio_core::{AdapterType, HealthStatus, PluginAdapter, StorageAdapter, VelioError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, VelioError> {
        self.db.get().ok_or_else(|| VelioError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, VelioError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VelioError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), VelioError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VelioError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), VelioError> {
        self.db()?.close().await
    }

    // --- Conversations ---

    async fn find_or_create_conversation(
        &self,
        phone_key: &str,
        chat_id: Option<&str>,
        demo: bool,
    ) -> Result<Conversation, VelioError> {
        let now = velio_core::time::now_millis();
        queries::conversations::find_or_create(self.db()?, phone_key, chat_id, demo, &now).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, VelioError> {
        queries::conversations::get(self.db()?, id).await
    }

    async fn find_conversation_by_phone(
        &self,
        phone_key: &str,
    ) -> Result<Option<Conversation>, VelioError> {
        queries::conversations::find_by_phone(self.db()?, phone_key).await
    }

    async fn list_conversations(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Conversation>, u64), VelioError> {
        queries::conversations::list(self.db()?, page, limit).await
    }

    async fn touch_last_message(&self, id: &str, at: &str) -> Result<(), VelioError> {
        queries::conversations::touch_last_message(self.db()?, id, at).await
    }

    async fn apply_state_change(&self, change: &StateChange) -> Result<bool, VelioError> {
        queries::conversations::apply_state_change(self.db()?, change).await
    }

    async fn set_conversation_state(
        &self,
        id: &str,
        state: ConversationState,
        reason: &str,
        at: &str,
    ) -> Result<Option<Conversation>, VelioError> {
        queries::conversations::set_state(self.db()?, id, state, reason, at).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, VelioError> {
        queries::conversations::delete(self.db()?, id).await
    }

    // --- Messages ---

    async fn insert_message(&self, msg: &MessageRecord) -> Result<(), VelioError> {
        queries::messages::insert(self.db()?, msg).await
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MessageRecord>, VelioError> {
        queries::messages::get_for_conversation(self.db()?, conversation_id, limit).await
    }

    async fn find_message_by_external_id(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<MessageRecord>, VelioError> {
        queries::messages::find_by_external_id(self.db()?, conversation_id, external_id).await
    }

    async fn find_similar_message(
        &self,
        conversation_id: &str,
        body: &str,
        is_from_me: bool,
        from: &str,
        to: &str,
    ) -> Result<Option<MessageRecord>, VelioError> {
        queries::messages::find_similar(self.db()?, conversation_id, body, is_from_me, from, to)
            .await
    }

    async fn delete_messages(&self, ids: &[String]) -> Result<usize, VelioError> {
        queries::messages::delete_by_ids(self.db()?, ids).await
    }

    // --- Price offers ---

    async fn insert_price_offer(&self, offer: &PriceOffer) -> Result<(), VelioError> {
        queries::price_offers::insert(self.db()?, offer).await
    }

    async fn list_price_offers(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<PriceOffer>, VelioError> {
        queries::price_offers::list_for_conversation(self.db()?, conversation_id).await
    }

    // --- Listings ---

    async fn insert_listing(&self, listing: &Listing) -> Result<(), VelioError> {
        queries::listings::insert(self.db()?, listing).await
    }

    async fn find_listing_by_phone(
        &self,
        phone_key: &str,
    ) -> Result<Option<Listing>, VelioError> {
        queries::listings::find_by_phone(self.db()?, phone_key).await
    }

    async fn get_listing(&self, id: &str) -> Result<Option<Listing>, VelioError> {
        queries::listings::get(self.db()?, id).await
    }

    async fn set_listing_contact_status(
        &self,
        id: &str,
        status: &str,
        at: &str,
    ) -> Result<(), VelioError> {
        queries::listings::set_contact_status(self.db()?, id, status, at).await
    }
}
