use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    dto::PageRequest,
    error::Result,
    message::message_models::{Message, MessageType},
};

pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends the message and bumps the conversation's `last_message_at` in
    /// one transaction. `created_at` is strictly greater than that of every
    /// earlier message in the conversation.
    async fn insert(&self, message: NewMessage) -> Result<Message>;

    /// Includes soft-deleted rows.
    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<Message>>;

    /// Non-deleted messages, newest first, fetching `page.fetch_limit()` rows.
    async fn list(&self, conversation_id: Uuid, page: PageRequest) -> Result<Vec<Message>>;

    async fn latest(&self, conversation_id: Uuid) -> Result<Option<Message>>;

    /// Non-deleted messages from others, created strictly after `since` when given.
    async fn count_unread(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64>;

    /// `None` if the message is missing or already deleted.
    async fn update_content(&self, message_id: Uuid, content: &str) -> Result<Option<Message>>;

    /// `None` if the message is missing or already deleted.
    async fn soft_delete(&self, message_id: Uuid) -> Result<Option<Message>>;
}
