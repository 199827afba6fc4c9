use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{dto::PageRequest, error::Result};
use super::{
    conversation_models::{Conversation, DirectKey, Participant, DIRECT},
    conversation_store::ConversationStore,
};

#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn find_direct(&self, key: &DirectKey) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM conversations WHERE direct_key = $1")
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    async fn create_direct(&self, key: &DirectKey, created_by: Uuid) -> Result<Option<Conversation>> {
        let mut tx = self.pool.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (conversation_type, product_id, created_by, direct_key)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (direct_key) WHERE direct_key IS NOT NULL DO NOTHING
             RETURNING id, conversation_type, product_id, created_by, created_at, updated_at, last_message_at",
        )
        .bind(DIRECT)
        .bind(key.product_id())
        .bind(created_by)
        .bind(key.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        // Lost the race; dropping `tx` rolls back.
        let Some(conversation) = conversation else {
            return Ok(None);
        };

        let (low, high) = key.users();
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id)
             VALUES ($1, $2), ($1, $3)",
        )
        .bind(conversation.id)
        .bind(low)
        .bind(high)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(conversation))
    }

    async fn find_by_id(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, conversation_type, product_id, created_by, created_at, updated_at, last_message_at
             FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT * FROM conversation_participants
             WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn active_participants(&self, conversation_id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT * FROM conversation_participants
             WHERE conversation_id = $1 AND left_at IS NULL
             ORDER BY joined_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT c.id, c.conversation_type, c.product_id, c.created_by,
                    c.created_at, c.updated_at, c.last_message_at
             FROM conversations c
             JOIN conversation_participants cp ON cp.conversation_id = c.id
             WHERE cp.user_id = $1 AND cp.left_at IS NULL
             ORDER BY c.last_message_at DESC, c.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.fetch_limit())
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        // GREATEST skips NULLs, so a first read simply takes the new value.
        // With no visible message the cursor takes the committed conversation
        // clock, which an in-flight send always stamps past.
        let participant = sqlx::query_as::<_, Participant>(
            "WITH newest AS (
                SELECT id, created_at FROM messages
                WHERE conversation_id = $1 AND is_deleted = FALSE
                ORDER BY created_at DESC
                LIMIT 1
             )
             UPDATE conversation_participants cp SET
                last_read_message_id = CASE
                    WHEN (SELECT created_at FROM newest) >= COALESCE(cp.last_read_at, '-infinity'::timestamptz)
                        THEN (SELECT id FROM newest)
                    ELSE cp.last_read_message_id
                END,
                last_read_at = GREATEST(
                    cp.last_read_at,
                    COALESCE(
                        (SELECT created_at FROM newest),
                        (SELECT last_message_at FROM conversations WHERE id = $1)
                    )
                )
             WHERE cp.conversation_id = $1 AND cp.user_id = $2
             RETURNING cp.*",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn leave(&self, conversation_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE conversation_participants SET left_at = NOW()
             WHERE conversation_id = $1 AND user_id = $2 AND left_at IS NULL",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET direct_key = NULL, updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn set_muted(&self, conversation_id: Uuid, user_id: Uuid, muted: bool) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "UPDATE conversation_participants SET muted = $3
             WHERE conversation_id = $1 AND user_id = $2 AND left_at IS NULL
             RETURNING *",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(muted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        message::{
            message_models::MessageType,
            message_repository::MessageRepository,
            message_store::{MessageStore, NewMessage},
        },
        testing::{insert_test_user, test_database},
    };

    fn text(conversation_id: Uuid, sender_id: Uuid, content: &str) -> NewMessage {
        NewMessage {
            conversation_id,
            sender_id,
            message_type: MessageType::Text,
            content: Some(content.to_string()),
            file_url: None,
            reply_to_message_id: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "Requires PostgreSQL database"]
    async fn test_racing_create_direct_has_one_winner() {
        let pool = test_database().await;
        let ada = insert_test_user(&pool, "ada").await;
        let bob = insert_test_user(&pool, "bob").await;
        let repo = ConversationRepository::new(pool.clone());
        let key = DirectKey::new(ada, bob, None);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move { repo.create_direct(&key, ada).await }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            if let Some(conversation) = handle.await.unwrap().unwrap() {
                winners.push(conversation.id);
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(repo.find_direct(&key).await.unwrap(), Some(winners[0]));
        assert_eq!(repo.active_participants(winners[0]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL database"]
    async fn test_leave_releases_direct_key() {
        let pool = test_database().await;
        let ada = insert_test_user(&pool, "ada").await;
        let bob = insert_test_user(&pool, "bob").await;
        let repo = ConversationRepository::new(pool);
        let key = DirectKey::new(ada, bob, None);

        let first = repo.create_direct(&key, ada).await.unwrap().unwrap();
        repo.leave(first.id, bob).await.unwrap();

        assert_eq!(repo.find_direct(&key).await.unwrap(), None);
        let second = repo.create_direct(&key, ada).await.unwrap().unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL database"]
    async fn test_mark_read_follows_newest_and_never_regresses() {
        let pool = test_database().await;
        let ada = insert_test_user(&pool, "ada").await;
        let bob = insert_test_user(&pool, "bob").await;
        let repo = ConversationRepository::new(pool.clone());
        let messages = MessageRepository::new(pool.clone());
        let conversation = repo
            .create_direct(&DirectKey::new(ada, bob, None), ada)
            .await
            .unwrap()
            .unwrap();

        // Empty conversation: the cursor sits on the conversation clock.
        let empty = repo.mark_read(conversation.id, ada).await.unwrap().unwrap();
        assert_eq!(empty.last_read_message_id, None);
        assert_eq!(empty.last_read_at, Some(conversation.last_message_at));

        messages.insert(text(conversation.id, bob, "one")).await.unwrap();
        let newest = messages.insert(text(conversation.id, bob, "two")).await.unwrap();

        let read = repo.mark_read(conversation.id, ada).await.unwrap().unwrap();
        assert_eq!(read.last_read_message_id, Some(newest.id));
        assert_eq!(read.last_read_at, Some(newest.created_at));

        messages.soft_delete(newest.id).await.unwrap();
        let again = repo.mark_read(conversation.id, ada).await.unwrap().unwrap();
        assert_eq!(again.last_read_message_id, Some(newest.id));
        assert_eq!(again.last_read_at, Some(newest.created_at));

        let outsider = insert_test_user(&pool, "cleo").await;
        assert!(repo.mark_read(conversation.id, outsider).await.unwrap().is_none());
    }
}
