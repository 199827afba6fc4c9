use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    error::Result,
    message::message_models::{MessageDetail, MessageEvent, MessageEventKind, MessageType},
    websocket::{types::WsMessage, ConnectionManager},
};
use super::{
    notification_models::{NewNotification, NEW_MESSAGE},
    notification_repository::NotificationRepository,
    notifier::Notifier,
};

const PREVIEW_CHARS: usize = 100;

/// Fans message events out to SSE subscribers, open websockets and the
/// persisted inbox.
#[derive(Clone)]
pub struct RealtimeNotifier {
    message_tx: broadcast::Sender<MessageEvent>,
    ws_connections: ConnectionManager,
    notification_repository: NotificationRepository,
}

impl RealtimeNotifier {
    pub fn new(
        message_tx: broadcast::Sender<MessageEvent>,
        ws_connections: ConnectionManager,
        notification_repository: NotificationRepository,
    ) -> Self {
        Self {
            message_tx,
            ws_connections,
            notification_repository,
        }
    }
}

#[async_trait]
impl Notifier for RealtimeNotifier {
    async fn publish(&self, event: MessageEvent) -> Result<()> {
        // No SSE subscribers is not an error.
        let _ = self.message_tx.send(event.clone());

        self.ws_connections
            .send_to_users(&event.recipients, WsMessage::from(&event));

        if event.kind != MessageEventKind::Created {
            return Ok(());
        }

        let preview = inbox_preview(&event.message);
        for recipient in &event.recipients {
            self.notification_repository
                .create(NewNotification {
                    user_id: *recipient,
                    notification_type: NEW_MESSAGE,
                    title: "New message",
                    message: &preview,
                    related_conversation_id: Some(event.conversation_id),
                    related_user_id: Some(event.message.sender_id),
                })
                .await?;
        }

        let online = event
            .recipients
            .iter()
            .filter(|user_id| self.ws_connections.is_user_online(user_id))
            .count();
        tracing::debug!(
            conversation_id = %event.conversation_id,
            recipients = event.recipients.len(),
            online,
            "message event delivered"
        );

        Ok(())
    }
}

fn inbox_preview(message: &MessageDetail) -> String {
    let sender = message
        .sender
        .as_ref()
        .map(|s| s.display_name.clone().unwrap_or_else(|| s.username.clone()))
        .unwrap_or_else(|| "Someone".to_string());

    match message.message_type.parse::<MessageType>() {
        Ok(MessageType::Image) => format!("{} sent an image", sender),
        Ok(MessageType::File) => format!("{} sent a file", sender),
        _ => {
            let content = message.content.as_deref().unwrap_or_default();
            let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
            if content.chars().count() > PREVIEW_CHARS {
                preview.push_str("...");
            }
            format!("{}: {}", sender, preview)
        }
    }
}
