use std::sync::Arc;

use uuid::Uuid;

use crate::{
    conversation::{
        conversation_dto::{ConversationDetail, ReadReceipt},
        conversation_models::{Conversation, DirectKey, Participant},
        conversation_store::ConversationStore,
    },
    dto::{Page, PageRequest},
    error::{AppError, Result},
    message::{message_models::MessagePreview, message_store::MessageStore},
    product::product_catalog::ProductCatalog,
    user::user_directory::UserDirectory,
};

/// Outcome of [`ConversationService::get_or_create`].
pub struct Resolved {
    pub conversation: ConversationDetail,
    pub created: bool,
}

#[derive(Clone)]
pub struct ConversationService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
    products: Arc<dyn ProductCatalog>,
}

impl ConversationService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        products: Arc<dyn ProductCatalog>,
    ) -> Self {
        Self {
            conversations,
            messages,
            users,
            products,
        }
    }

    /// Returns the direct conversation between the caller and `other_user_id`
    /// about `product_id`, creating it if neither has one yet.
    pub async fn get_or_create(
        &self,
        caller: Uuid,
        other_user_id: Uuid,
        product_id: Option<Uuid>,
    ) -> Result<Resolved> {
        if caller == other_user_id {
            return Err(AppError::InvalidInput(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }

        self.users
            .find_summary(other_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let product = match product_id {
            Some(id) => Some(
                self.products
                    .find_summary(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?,
            ),
            None => None,
        };

        let key = DirectKey::new(caller, other_user_id, product_id);

        if let Some(existing) = self.conversations.find_direct(&key).await? {
            return Ok(Resolved {
                conversation: self.get_conversation(existing, caller).await?,
                created: false,
            });
        }

        // Only new conversations require the listing to still be open.
        if product.as_ref().is_some_and(|p| !p.is_active()) {
            return Err(AppError::NotFound("Product is no longer available".to_string()));
        }

        let conversation_id = match self.conversations.create_direct(&key, caller).await? {
            Some(conversation) => {
                tracing::info!(conversation_id = %conversation.id, "conversation created");
                return Ok(Resolved {
                    conversation: self.get_conversation(conversation.id, caller).await?,
                    created: true,
                });
            }
            None => self.conversations.find_direct(&key).await?.ok_or_else(|| {
                tracing::error!(key = %key, "direct key conflict without a holder");
                AppError::InternalError
            })?,
        };

        tracing::debug!(%conversation_id, "conversation created concurrently, reusing");

        Ok(Resolved {
            conversation: self.get_conversation(conversation_id, caller).await?,
            created: false,
        })
    }

    pub async fn list_conversations(
        &self,
        caller: Uuid,
        page: PageRequest,
    ) -> Result<Page<ConversationDetail>> {
        let rows = self.conversations.list_for_user(caller, page).await?;
        let page = Page::from_overfetch(rows, page);

        let mut items = Vec::with_capacity(page.items.len());
        for conversation in &page.items {
            let participant = self.require_active(conversation.id, caller).await?;
            items.push(self.describe(conversation.clone(), caller, &participant).await?);
        }

        Ok(page.with_items(items))
    }

    pub async fn get_conversation(&self, conversation_id: Uuid, caller: Uuid) -> Result<ConversationDetail> {
        let participant = self.require_active(conversation_id, caller).await?;
        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        self.describe(conversation, caller, &participant).await
    }

    pub async fn unread_count(&self, conversation_id: Uuid, caller: Uuid) -> Result<i64> {
        let participant = self.require_active(conversation_id, caller).await?;
        self.messages
            .count_unread(conversation_id, caller, participant.last_read_at)
            .await
    }

    /// Moves the caller's read cursor to the newest message. Works for
    /// former participants too; only a missing membership is an error.
    pub async fn mark_read(&self, conversation_id: Uuid, caller: Uuid) -> Result<ReadReceipt> {
        let participant = self
            .conversations
            .mark_read(conversation_id, caller)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        Ok(ReadReceipt {
            conversation_id,
            last_read_message_id: participant.last_read_message_id,
            last_read_at: participant.last_read_at,
        })
    }

    pub async fn leave(&self, conversation_id: Uuid, caller: Uuid) -> Result<()> {
        self.require_active(conversation_id, caller).await?;
        self.conversations.leave(conversation_id, caller).await?;

        tracing::info!(%conversation_id, user_id = %caller, "participant left conversation");
        Ok(())
    }

    pub async fn set_muted(&self, conversation_id: Uuid, caller: Uuid, muted: bool) -> Result<bool> {
        let participant = self
            .conversations
            .set_muted(conversation_id, caller, muted)
            .await?
            .ok_or_else(not_a_participant)?;

        Ok(participant.muted)
    }

    /// Other active participants who accept realtime pushes.
    pub async fn other_participants(&self, conversation_id: Uuid, caller: Uuid) -> Result<Vec<Uuid>> {
        self.require_active(conversation_id, caller).await?;

        Ok(self
            .conversations
            .active_participants(conversation_id)
            .await?
            .into_iter()
            .filter(|p| p.user_id != caller && !p.muted)
            .map(|p| p.user_id)
            .collect())
    }

    async fn require_active(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Participant> {
        self.conversations
            .find_participant(conversation_id, user_id)
            .await?
            .filter(Participant::is_active)
            .ok_or_else(not_a_participant)
    }

    async fn describe(
        &self,
        conversation: Conversation,
        caller: Uuid,
        me: &Participant,
    ) -> Result<ConversationDetail> {
        let mut participants = Vec::new();
        for other in self.conversations.active_participants(conversation.id).await? {
            if other.user_id == caller {
                continue;
            }
            if let Some(summary) = self.users.find_summary(other.user_id).await? {
                participants.push(summary);
            }
        }

        let product = match conversation.product_id {
            Some(id) => self.products.find_summary(id).await?,
            None => None,
        };

        let last_message = self
            .messages
            .latest(conversation.id)
            .await?
            .map(MessagePreview::from);

        let unread_count = self
            .messages
            .count_unread(conversation.id, caller, me.last_read_at)
            .await?;

        Ok(ConversationDetail {
            id: conversation.id,
            conversation_type: conversation.conversation_type,
            product_id: conversation.product_id,
            product,
            created_by: conversation.created_by,
            participants,
            last_message,
            unread_count,
            muted: me.muted,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            last_message_at: conversation.last_message_at,
        })
    }
}

pub(crate) fn not_a_participant() -> AppError {
    AppError::Forbidden("You are not a participant in this conversation".to_string())
}
