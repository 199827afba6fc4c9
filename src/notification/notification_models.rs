use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const NEW_MESSAGE: &str = "new_message";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_conversation_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

pub struct NewNotification<'a> {
    pub user_id: Uuid,
    pub notification_type: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub related_conversation_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
}
