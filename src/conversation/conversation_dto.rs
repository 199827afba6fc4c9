use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    message::message_models::MessagePreview,
    product::product_models::ProductSummary,
    user::user_models::UserSummary,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    /// The other participant
    pub user_id: Uuid,
    /// Listing the conversation is about, if any
    pub product_id: Option<Uuid>,
}

/// A conversation as seen by one of its participants.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationDetail {
    pub id: Uuid,
    pub conversation_type: String,
    pub product_id: Option<Uuid>,
    pub product: Option<ProductSummary>,
    pub created_by: Uuid,
    /// Active participants other than the caller
    pub participants: Vec<UserSummary>,
    pub last_message: Option<MessagePreview>,
    pub unread_count: i64,
    pub muted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MuteRequest {
    pub muted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub conversation_id: Uuid,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadReceipt {
    pub conversation_id: Uuid,
    pub last_read_message_id: Option<Uuid>,
    pub last_read_at: Option<DateTime<Utc>>,
}
