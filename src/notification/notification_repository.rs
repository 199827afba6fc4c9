use crate::{dto::PageRequest, error::Result};
use sqlx::PgPool;
use uuid::Uuid;
use super::notification_models::{NewNotification, Notification};

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_page_by_user(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        )
        .bind(user_id)
        .bind(page.fetch_limit())
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_as_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2
             RETURNING *"
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn create(&self, new: NewNotification<'_>) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications
                (user_id, notification_type, title, message, related_conversation_id, related_user_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *"
        )
        .bind(new.user_id)
        .bind(new.notification_type)
        .bind(new.title)
        .bind(new.message)
        .bind(new.related_conversation_id)
        .bind(new.related_user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }
}
