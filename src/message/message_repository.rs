use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{dto::PageRequest, error::Result};
use super::{
    message_models::Message,
    message_store::{MessageStore, NewMessage},
};

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message> {
        let mut tx = self.pool.begin().await?;

        // Updating the conversation first takes its row lock, so concurrent
        // sends into one conversation serialize here and get increasing stamps.
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE conversations SET
                last_message_at = GREATEST(clock_timestamp(), last_message_at + interval '1 microsecond'),
                updated_at = NOW()
             WHERE id = $1
             RETURNING last_message_at",
        )
        .bind(message.conversation_id)
        .fetch_one(&mut *tx)
        .await?;

        let stored = sqlx::query_as::<_, Message>(
            "INSERT INTO messages
                (conversation_id, sender_id, message_type, content, file_url,
                 reply_to_message_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING *",
        )
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.message_type.as_str())
        .bind(message.content)
        .bind(message.file_url)
        .bind(message.reply_to_message_id)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stored)
    }

    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn list(&self, conversation_id: Uuid, page: PageRequest) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages
             WHERE conversation_id = $1 AND is_deleted = FALSE
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(conversation_id)
        .bind(page.fetch_limit())
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn latest(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages
             WHERE conversation_id = $1 AND is_deleted = FALSE
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn count_unread(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages
             WHERE conversation_id = $1
               AND sender_id <> $2
               AND is_deleted = FALSE
               AND ($3::timestamptz IS NULL OR created_at > $3)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn update_content(&self, message_id: Uuid, content: &str) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            "UPDATE messages SET content = $2, updated_at = NOW(), edited_at = NOW()
             WHERE id = $1 AND is_deleted = FALSE
             RETURNING *",
        )
        .bind(message_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn soft_delete(&self, message_id: Uuid) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            "UPDATE messages SET is_deleted = TRUE, updated_at = NOW()
             WHERE id = $1 AND is_deleted = FALSE
             RETURNING *",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }
}
