// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::VelioError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Conversation, ConversationState, Listing, MessageRecord, PriceOffer, StateChange,
};

/// Adapter for storage and persistence backends.
///
/// Carries the full persistence contract the ingestion pipeline depends on:
/// race-safe conversation find-or-create, idempotent message insertion
/// helpers, optimistic state updates, and the price-offer / listing CRUD.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), VelioError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), VelioError>;

    // --- Conversations ---

    /// Finds the conversation for a canonical phone key, creating it if
    /// absent. Concurrent creation attempts for the same key must converge
    /// to one row (unique constraint, insert-or-ignore, re-select).
    async fn find_or_create_conversation(
        &self,
        phone_key: &str,
        chat_id: Option<&str>,
        demo: bool,
    ) -> Result<Conversation, VelioError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, VelioError>;

    async fn find_conversation_by_phone(
        &self,
        phone_key: &str,
    ) -> Result<Option<Conversation>, VelioError>;

    /// Returns one page of conversations (most recently contacted first)
    /// plus the total row count.
    async fn list_conversations(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Conversation>, u64), VelioError>;

    /// Updates `last_message_at`.
    async fn touch_last_message(&self, id: &str, at: &str) -> Result<(), VelioError>;

    /// Applies an optimistic state change. Returns `false` when the expected
    /// state no longer matches (a concurrent writer won).
    async fn apply_state_change(&self, change: &StateChange) -> Result<bool, VelioError>;

    /// Operator override: sets any state with an explicit reason,
    /// unconditionally. Returns the updated conversation, or `None` when the
    /// id does not exist.
    async fn set_conversation_state(
        &self,
        id: &str,
        state: ConversationState,
        reason: &str,
        at: &str,
    ) -> Result<Option<Conversation>, VelioError>;

    /// Administrative reset: deletes the conversation and cascades to its
    /// messages and price offers.
    async fn delete_conversation(&self, id: &str) -> Result<bool, VelioError>;

    // --- Messages ---

    async fn insert_message(&self, msg: &MessageRecord) -> Result<(), VelioError>;

    /// Messages of a conversation in `timestamp` order (oldest first).
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MessageRecord>, VelioError>;

    /// Exact-match idempotency lookup by transport message id.
    async fn find_message_by_external_id(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<MessageRecord>, VelioError>;

    /// Fuzzy duplicate lookup: same body and direction with a timestamp
    /// inside `[from, to]` (RFC 3339 bounds, inclusive).
    async fn find_similar_message(
        &self,
        conversation_id: &str,
        body: &str,
        is_from_me: bool,
        from: &str,
        to: &str,
    ) -> Result<Option<MessageRecord>, VelioError>;

    /// Bulk delete by id; returns the number of rows removed.
    async fn delete_messages(&self, ids: &[String]) -> Result<usize, VelioError>;

    // --- Price offers ---

    async fn insert_price_offer(&self, offer: &PriceOffer) -> Result<(), VelioError>;

    async fn list_price_offers(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<PriceOffer>, VelioError>;

    // --- Listings ---

    async fn insert_listing(&self, listing: &Listing) -> Result<(), VelioError>;

    async fn find_listing_by_phone(&self, phone_key: &str)
    -> Result<Option<Listing>, VelioError>;

    async fn get_listing(&self, id: &str) -> Result<Option<Listing>, VelioError>;

    async fn set_listing_contact_status(
        &self,
        id: &str,
        status: &str,
        at: &str,
    ) -> Result<(), VelioError>;
}
