use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::message::message_models::{MessageDetail, MessageEvent, MessageEventKind};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    NewMessage(MessageDetail),
    MessageEdited(MessageDetail),
    MessageDeleted(MessageDeletedPayload),
    Typing(TypingPayload),
    ReadReceipt(ReadReceiptPayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDeletedPayload {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TypingPayload {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadReceiptPayload {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub last_read_message_id: Option<Uuid>,
    pub last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    pub message: String,
}

impl From<&MessageEvent> for WsMessage {
    fn from(event: &MessageEvent) -> Self {
        match event.kind {
            MessageEventKind::Created => WsMessage::NewMessage(event.message.clone()),
            MessageEventKind::Edited => WsMessage::MessageEdited(event.message.clone()),
            MessageEventKind::Deleted => WsMessage::MessageDeleted(MessageDeletedPayload {
                conversation_id: event.conversation_id,
                message_id: event.message.id,
            }),
        }
    }
}

// Client-to-server messages
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Typing {
        conversation_id: Uuid,
        is_typing: bool,
    },
    MarkRead {
        conversation_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_are_tagged_by_type() {
        let id = Uuid::new_v4();

        let msg: ClientMessage =
            serde_json::from_str(&format!(r#"{{"type":"typing","conversation_id":"{}","is_typing":true}}"#, id)).unwrap();
        assert!(matches!(msg, ClientMessage::Typing { conversation_id, is_typing: true } if conversation_id == id));

        let msg: ClientMessage =
            serde_json::from_str(&format!(r#"{{"type":"mark_read","conversation_id":"{}"}}"#, id)).unwrap();
        assert!(matches!(msg, ClientMessage::MarkRead { conversation_id } if conversation_id == id));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"send_message"}"#).is_err());
    }

    #[test]
    fn test_server_messages_carry_type_tag() {
        let json = serde_json::to_value(WsMessage::MessageDeleted(MessageDeletedPayload {
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
        }))
        .unwrap();
        assert_eq!(json["type"], "message_deleted");
    }
}
