use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    dto::PageRequest,
    error::Result,
    conversation::conversation_models::{Conversation, DirectKey, Participant},
};

/// Persistence for conversations and their participants.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Conversation currently holding `key`, i.e. with both users active.
    async fn find_direct(&self, key: &DirectKey) -> Result<Option<Uuid>>;

    /// Creates the conversation and both participant rows atomically.
    /// Returns `None` when another writer claimed `key` first.
    async fn create_direct(&self, key: &DirectKey, created_by: Uuid) -> Result<Option<Conversation>>;

    async fn find_by_id(&self, conversation_id: Uuid) -> Result<Option<Conversation>>;

    /// Membership row regardless of whether the user has left.
    async fn find_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Participant>>;

    async fn active_participants(&self, conversation_id: Uuid) -> Result<Vec<Participant>>;

    /// Conversations the user is active in, newest activity first, fetching
    /// `page.fetch_limit()` rows.
    async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Conversation>>;

    /// Moves the read cursor to the newest non-deleted message, never backwards.
    /// `None` when the user has no membership row.
    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Participant>>;

    /// Marks the membership as left and releases the conversation's direct key.
    async fn leave(&self, conversation_id: Uuid, user_id: Uuid) -> Result<()>;

    async fn set_muted(&self, conversation_id: Uuid, user_id: Uuid, muted: bool) -> Result<Option<Participant>>;
}
