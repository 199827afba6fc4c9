use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, user::user_models::UserSummary};

pub const MAX_CONTENT_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "file" => Ok(MessageType::File),
            other => Err(AppError::InvalidInput(format!("Unsupported message type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

impl Message {
    pub fn is_text(&self) -> bool {
        self.message_type == MessageType::Text.as_str()
    }
}

/// Copy of the message being replied to, embedded in the reply.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReplySummary {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub message_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for ReplySummary {
    /// A deleted original keeps its historical payload; `is_deleted` marks it.
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            message_type: message.message_type.clone(),
            content: message.content.clone(),
            file_url: message.file_url.clone(),
            is_deleted: message.is_deleted,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDetail {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender: Option<UserSummary>,
    pub message_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
    pub reply_to: Option<ReplySummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

impl MessageDetail {
    pub fn new(message: Message, sender: Option<UserSummary>, reply_to: Option<ReplySummary>) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender,
            message_type: message.message_type,
            content: message.content,
            file_url: message.file_url,
            reply_to_message_id: message.reply_to_message_id,
            reply_to,
            created_at: message.created_at,
            updated_at: message.updated_at,
            edited_at: message.edited_at,
            is_deleted: message.is_deleted,
        }
    }
}

/// Latest-message preview shown in conversation lists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessagePreview {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub message_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessagePreview {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            message_type: message.message_type,
            content: message.content,
            file_url: message.file_url,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEventKind {
    Created,
    Edited,
    Deleted,
}

/// Published after a message write commits.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEvent {
    pub kind: MessageEventKind,
    pub conversation_id: Uuid,
    /// Active participants other than the author.
    #[serde(skip)]
    pub recipients: Vec<Uuid>,
    pub message: MessageDetail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_parses_known_values() {
        assert_eq!("text".parse::<MessageType>().unwrap(), MessageType::Text);
        assert_eq!("image".parse::<MessageType>().unwrap(), MessageType::Image);
        assert_eq!("file".parse::<MessageType>().unwrap(), MessageType::File);
        assert_eq!(MessageType::Image.to_string(), "image");
    }

    #[test]
    fn test_message_type_rejects_unknown_values() {
        assert!(matches!(
            "video".parse::<MessageType>(),
            Err(AppError::InvalidInput(_))
        ));
        assert!("Text".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_reply_copy_of_deleted_original_keeps_content() {
        let now = Utc::now();
        let original = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            message_type: "image".into(),
            content: Some("the blue one".into()),
            file_url: Some("https://cdn.example.com/bike.jpg".into()),
            reply_to_message_id: None,
            created_at: now,
            updated_at: now,
            edited_at: None,
            is_deleted: true,
        };

        let copy = ReplySummary::from(&original);
        assert!(copy.is_deleted);
        assert_eq!(copy.content.as_deref(), Some("the blue one"));
        assert_eq!(copy.file_url.as_deref(), Some("https://cdn.example.com/bike.jpg"));
    }
}
