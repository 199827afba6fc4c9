use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::{
    conversation::{
        conversation_models::Participant, conversation_service::not_a_participant,
        conversation_store::ConversationStore,
    },
    dto::{Page, PageRequest},
    error::{AppError, Result},
    message::{
        message_models::{
            Message, MessageDetail, MessageEvent, MessageEventKind, MessageType, ReplySummary,
            MAX_CONTENT_CHARS,
        },
        message_store::{MessageStore, NewMessage},
    },
    notification::Notifier,
    user::{user_directory::UserDirectory, user_models::UserSummary},
};

/// Validated-on-use input for [`MessageService::send`].
pub struct OutgoingMessage {
    pub message_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct MessageService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl MessageService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            conversations,
            messages,
            users,
            notifier,
        }
    }

    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        outgoing: OutgoingMessage,
    ) -> Result<MessageDetail> {
        self.require_active(conversation_id, sender_id).await?;

        let message_type: MessageType = outgoing.message_type.parse()?;
        let (content, file_url) = payload_for(message_type, outgoing.content, outgoing.file_url)?;

        let reply_to = match outgoing.reply_to_message_id {
            Some(reply_id) => Some(self.reply_target(conversation_id, reply_id).await?),
            None => None,
        };

        let message = self
            .messages
            .insert(NewMessage {
                conversation_id,
                sender_id,
                message_type,
                content,
                file_url,
                reply_to_message_id: reply_to.as_ref().map(|m| m.id),
            })
            .await?;

        tracing::debug!(message_id = %message.id, %conversation_id, "message sent");

        let sender = self.sender_after_commit(sender_id).await;
        let detail = MessageDetail::new(message, sender, reply_to.as_ref().map(ReplySummary::from));

        self.publish(MessageEventKind::Created, sender_id, detail.clone()).await;

        Ok(detail)
    }

    /// Newest first; soft-deleted messages are skipped.
    pub async fn list(
        &self,
        conversation_id: Uuid,
        caller: Uuid,
        page: PageRequest,
    ) -> Result<Page<MessageDetail>> {
        self.require_active(conversation_id, caller).await?;

        let rows = self.messages.list(conversation_id, page).await?;
        let page = Page::from_overfetch(rows, page);

        let mut senders: HashMap<Uuid, Option<UserSummary>> = HashMap::new();
        let mut items = Vec::with_capacity(page.items.len());
        for message in &page.items {
            let sender = match senders.get(&message.sender_id) {
                Some(cached) => cached.clone(),
                None => {
                    let found = self.users.find_summary(message.sender_id).await?;
                    senders.insert(message.sender_id, found.clone());
                    found
                }
            };
            let reply_to = self.reply_summary(message).await?;
            items.push(MessageDetail::new(message.clone(), sender, reply_to));
        }

        Ok(page.with_items(items))
    }

    pub async fn edit(&self, message_id: Uuid, caller: Uuid, content: String) -> Result<MessageDetail> {
        let message = self.owned_message(message_id, caller).await?;

        if !message.is_text() {
            return Err(AppError::InvalidOperation(
                "Only text messages can be edited".to_string(),
            ));
        }

        let content = text_content(Some(content))?;

        let updated = self
            .messages
            .update_content(message_id, &content)
            .await?
            .ok_or_else(message_not_found)?;

        let detail = self.detail(updated).await;
        self.publish(MessageEventKind::Edited, caller, detail.clone()).await;

        Ok(detail)
    }

    pub async fn delete(&self, message_id: Uuid, caller: Uuid) -> Result<()> {
        self.owned_message(message_id, caller).await?;

        let deleted = self
            .messages
            .soft_delete(message_id)
            .await?
            .ok_or_else(message_not_found)?;

        let detail = self.detail(deleted).await;
        self.publish(MessageEventKind::Deleted, caller, detail).await;

        Ok(())
    }

    /// Sender check comes before the deleted check, so non-senders always
    /// get `Forbidden`.
    async fn owned_message(&self, message_id: Uuid, caller: Uuid) -> Result<Message> {
        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(message_not_found)?;

        if message.sender_id != caller {
            return Err(AppError::Forbidden(
                "You can only modify your own messages".to_string(),
            ));
        }
        if message.is_deleted {
            return Err(message_not_found());
        }

        Ok(message)
    }

    async fn reply_target(&self, conversation_id: Uuid, reply_id: Uuid) -> Result<Message> {
        self.messages
            .find_by_id(reply_id)
            .await?
            .filter(|m| m.conversation_id == conversation_id && !m.is_deleted)
            .ok_or_else(|| AppError::NotFound("Reply target not found".to_string()))
    }

    async fn reply_summary(&self, message: &Message) -> Result<Option<ReplySummary>> {
        let Some(reply_id) = message.reply_to_message_id else {
            return Ok(None);
        };

        Ok(self
            .messages
            .find_by_id(reply_id)
            .await?
            .as_ref()
            .map(ReplySummary::from))
    }

    /// Builds the response for a write that has already committed, so lookup
    /// failures only cost the embedded copies.
    async fn detail(&self, message: Message) -> MessageDetail {
        let sender = self.sender_after_commit(message.sender_id).await;
        let reply_to = self.reply_summary(&message).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, message_id = %message.id, "could not load reply target");
            None
        });
        MessageDetail::new(message, sender, reply_to)
    }

    async fn sender_after_commit(&self, sender_id: Uuid) -> Option<UserSummary> {
        match self.users.find_summary(sender_id).await {
            Ok(sender) => sender,
            Err(e) => {
                tracing::warn!(error = %e, %sender_id, "could not load message sender");
                None
            }
        }
    }

    async fn require_active(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Participant> {
        self.conversations
            .find_participant(conversation_id, user_id)
            .await?
            .filter(Participant::is_active)
            .ok_or_else(not_a_participant)
    }

    /// Hands the event to the notifier on a detached task. Muted participants
    /// are not addressed.
    async fn publish(&self, kind: MessageEventKind, author: Uuid, message: MessageDetail) {
        let conversation_id = message.conversation_id;

        let recipients = match self.conversations.active_participants(conversation_id).await {
            Ok(participants) => participants
                .into_iter()
                .filter(|p| p.user_id != author && !p.muted)
                .map(|p| p.user_id)
                .collect::<Vec<_>>(),
            Err(e) => {
                tracing::warn!(error = %e, %conversation_id, "could not resolve event recipients");
                return;
            }
        };

        let event = MessageEvent {
            kind,
            conversation_id,
            recipients,
            message,
        };

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.publish(event).await {
                tracing::warn!(error = %e, %conversation_id, "failed to publish message event");
            }
        });
    }
}

fn message_not_found() -> AppError {
    AppError::NotFound("Message not found".to_string())
}

fn text_content(content: Option<String>) -> Result<String> {
    let content = content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(AppError::InvalidInput("Message content is required".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Message content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(content)
}

/// Text needs content; attachments need a file URL and may carry a caption.
fn payload_for(
    message_type: MessageType,
    content: Option<String>,
    file_url: Option<String>,
) -> Result<(Option<String>, Option<String>)> {
    match message_type {
        MessageType::Text => Ok((Some(text_content(content)?), None)),
        MessageType::Image | MessageType::File => {
            let file_url = file_url
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("file_url is required for {} messages", message_type))
                })?;
            let caption = content.filter(|c| !c.trim().is_empty());
            if caption.as_ref().is_some_and(|c| c.chars().count() > MAX_CONTENT_CHARS) {
                return Err(AppError::InvalidInput(format!(
                    "Message content must be at most {} characters",
                    MAX_CONTENT_CHARS
                )));
            }
            Ok((caption, Some(file_url)))
        }
    }
}
