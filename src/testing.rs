//! In-memory stand-ins for the Postgres stores, used by service tests.
//!
//! `MemoryStore` mirrors the guarantees the SQL gives: direct keys are unique,
//! message timestamps strictly increase, and deletes only flip a flag.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db::{create_pool, run_migrations, DbPool},
    conversation::{
        conversation_models::{Conversation, DirectKey, Participant, DIRECT},
        conversation_store::ConversationStore,
    },
    dto::PageRequest,
    error::{AppError, Result},
    message::{
        message_models::{Message, MessageEvent},
        message_store::{MessageStore, NewMessage},
    },
    notification::Notifier,
    product::{product_catalog::ProductCatalog, product_models::ProductSummary},
    user::{user_directory::UserDirectory, user_models::UserSummary},
};

#[derive(Default)]
struct Tables {
    clock: Option<DateTime<Utc>>,
    users: HashMap<Uuid, UserSummary>,
    products: HashMap<Uuid, ProductSummary>,
    conversations: Vec<Conversation>,
    direct_keys: HashMap<String, Uuid>,
    participants: Vec<Participant>,
    messages: Vec<Message>,
}

impl Tables {
    /// Strictly increasing "now", like `GREATEST(clock_timestamp(), last + 1µs)`.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn participant_mut(&mut self, conversation_id: Uuid, user_id: Uuid) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.conversation_id == conversation_id && p.user_id == user_id)
    }

    fn newest_message(&self, conversation_id: Uuid) -> Option<&Message> {
        self.messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && !m.is_deleted)
            .max_by_key(|m| m.created_at)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    missed_lookups: AtomicUsize,
    failing_user_lookups: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables().users.insert(
            id,
            UserSummary {
                id,
                username: username.to_string(),
                display_name: None,
                avatar_url: None,
            },
        );
        id
    }

    pub fn add_product(&self, seller_id: Uuid, status: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables().products.insert(
            id,
            ProductSummary {
                id,
                seller_id,
                title: "Road bike".to_string(),
                category: "sports".to_string(),
                estimated_size: None,
                status: status.to_string(),
            },
        );
        id
    }

    pub fn set_product_status(&self, product_id: Uuid, status: &str) {
        if let Some(product) = self.tables().products.get_mut(&product_id) {
            product.status = status.to_string();
        }
    }

    /// Makes the next `find_direct` report nothing, as if a concurrent
    /// creator committed right after the lookup.
    pub fn miss_next_direct_lookup(&self) {
        self.missed_lookups.fetch_add(1, Ordering::SeqCst);
    }

    /// Makes every `UserDirectory` lookup fail while set.
    pub fn fail_user_lookups(&self, failing: bool) {
        self.failing_user_lookups.store(failing, Ordering::SeqCst);
    }

    pub fn conversation_count(&self) -> usize {
        self.tables().conversations.len()
    }

    pub fn participant_count(&self, conversation_id: Uuid) -> usize {
        self.tables()
            .participants
            .iter()
            .filter(|p| p.conversation_id == conversation_id)
            .count()
    }

    /// Includes soft-deleted rows.
    pub fn message_count(&self, conversation_id: Uuid) -> usize {
        self.tables()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .count()
    }
}

fn page_of<T: Clone>(rows: &[T], page: PageRequest) -> Vec<T> {
    rows.iter()
        .skip(page.offset as usize)
        .take(page.fetch_limit() as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_summary(&self, user_id: Uuid) -> Result<Option<UserSummary>> {
        if self.failing_user_lookups.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables().users.get(&user_id).cloned())
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn find_summary(&self, product_id: Uuid) -> Result<Option<ProductSummary>> {
        Ok(self.tables().products.get(&product_id).cloned())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_direct(&self, key: &DirectKey) -> Result<Option<Uuid>> {
        let missed = self
            .missed_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if missed {
            return Ok(None);
        }

        Ok(self.tables().direct_keys.get(&key.to_string()).copied())
    }

    async fn create_direct(&self, key: &DirectKey, created_by: Uuid) -> Result<Option<Conversation>> {
        let mut tables = self.tables();
        if tables.direct_keys.contains_key(&key.to_string()) {
            return Ok(None);
        }

        let now = tables.tick();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            conversation_type: DIRECT.to_string(),
            product_id: key.product_id(),
            created_by,
            created_at: now,
            updated_at: now,
            last_message_at: now,
        };

        let (low, high) = key.users();
        for user_id in [low, high] {
            tables.participants.push(Participant {
                id: Uuid::new_v4(),
                conversation_id: conversation.id,
                user_id,
                joined_at: now,
                left_at: None,
                last_read_message_id: None,
                last_read_at: None,
                muted: false,
            });
        }
        tables.direct_keys.insert(key.to_string(), conversation.id);
        tables.conversations.push(conversation.clone());

        Ok(Some(conversation))
    }

    async fn find_by_id(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        Ok(self
            .tables()
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned())
    }

    async fn find_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        Ok(self
            .tables()
            .participant_mut(conversation_id, user_id)
            .map(|p| p.clone()))
    }

    async fn active_participants(&self, conversation_id: Uuid) -> Result<Vec<Participant>> {
        Ok(self
            .tables()
            .participants
            .iter()
            .filter(|p| p.conversation_id == conversation_id && p.is_active())
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Conversation>> {
        let tables = self.tables();
        let mut rows: Vec<Conversation> = tables
            .conversations
            .iter()
            .filter(|c| {
                tables
                    .participants
                    .iter()
                    .any(|p| p.conversation_id == c.id && p.user_id == user_id && p.is_active())
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at).then(b.id.cmp(&a.id)));

        Ok(page_of(&rows, page))
    }

    async fn mark_read(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Participant>> {
        let mut tables = self.tables();
        let newest = tables
            .newest_message(conversation_id)
            .map(|m| (m.id, m.created_at));
        let clock = tables
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .map(|c| c.last_message_at);

        let Some(participant) = tables.participant_mut(conversation_id, user_id) else {
            return Ok(None);
        };

        if let Some((id, at)) = newest {
            if participant.last_read_at.map_or(true, |current| at >= current) {
                participant.last_read_message_id = Some(id);
            }
        }
        let target = newest.map(|(_, at)| at).or(clock);
        participant.last_read_at = match (participant.last_read_at, target) {
            (Some(current), Some(target)) => Some(current.max(target)),
            (current, target) => current.or(target),
        };

        Ok(Some(participant.clone()))
    }

    async fn leave(&self, conversation_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut tables = self.tables();
        let now = tables.tick();

        if let Some(participant) = tables.participant_mut(conversation_id, user_id) {
            if participant.left_at.is_none() {
                participant.left_at = Some(now);
            }
        }
        tables.direct_keys.retain(|_, id| *id != conversation_id);
        if let Some(conversation) = tables.conversations.iter_mut().find(|c| c.id == conversation_id) {
            conversation.updated_at = now;
        }

        Ok(())
    }

    async fn set_muted(&self, conversation_id: Uuid, user_id: Uuid, muted: bool) -> Result<Option<Participant>> {
        let mut tables = self.tables();
        Ok(tables
            .participant_mut(conversation_id, user_id)
            .filter(|p| p.is_active())
            .map(|p| {
                p.muted = muted;
                p.clone()
            }))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: NewMessage) -> Result<Message> {
        let mut tables = self.tables();
        let created_at = tables.tick();

        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
            .ok_or(AppError::InternalError)?;
        conversation.last_message_at = created_at;
        conversation.updated_at = created_at;

        let stored = Message {
            id: Uuid::new_v4(),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            message_type: message.message_type.as_str().to_string(),
            content: message.content,
            file_url: message.file_url,
            reply_to_message_id: message.reply_to_message_id,
            created_at,
            updated_at: created_at,
            edited_at: None,
            is_deleted: false,
        };
        tables.messages.push(stored.clone());

        Ok(stored)
    }

    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<Message>> {
        Ok(self
            .tables()
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned())
    }

    async fn list(&self, conversation_id: Uuid, page: PageRequest) -> Result<Vec<Message>> {
        let tables = self.tables();
        let mut rows: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && !m.is_deleted)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(page_of(&rows, page))
    }

    async fn latest(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        Ok(self.tables().newest_message(conversation_id).cloned())
    }

    async fn count_unread(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let count = self
            .tables()
            .messages
            .iter()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && m.sender_id != user_id
                    && !m.is_deleted
                    && since.map_or(true, |cursor| m.created_at > cursor)
            })
            .count();

        Ok(count as i64)
    }

    async fn update_content(&self, message_id: Uuid, content: &str) -> Result<Option<Message>> {
        let mut tables = self.tables();
        let now = tables.tick();

        Ok(tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && !m.is_deleted)
            .map(|m| {
                m.content = Some(content.to_string());
                m.updated_at = now;
                m.edited_at = Some(now);
                m.clone()
            }))
    }

    async fn soft_delete(&self, message_id: Uuid) -> Result<Option<Message>> {
        let mut tables = self.tables();
        let now = tables.tick();

        Ok(tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && !m.is_deleted)
            .map(|m| {
                m.is_deleted = true;
                m.updated_at = now;
                m.clone()
            }))
    }
}

/// Forwards every published event to a channel.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<MessageEvent>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MessageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: MessageEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| AppError::InternalError)
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn publish(&self, _event: MessageEvent) -> Result<()> {
        Err(AppError::InternalError)
    }
}

/// Migrated pool for the ignored Postgres tests, from `TEST_DATABASE_URL`
/// (falling back to `DATABASE_URL`).
pub async fn test_database() -> DbPool {
    dotenv::dotenv().ok();
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set");

    let pool = create_pool(&url, 8).await.expect("database should be reachable");
    run_migrations(&pool).await.expect("migrations should apply");
    pool
}

/// Inserts a user with unique credentials and returns its id.
pub async fn insert_test_user(pool: &DbPool, username: &str) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash)
         VALUES ($1, $2, 'not-a-real-hash')
         RETURNING id",
    )
    .bind(format!("{}-{}", username, suffix))
    .bind(format!("{}-{}@example.com", username, suffix))
    .fetch_one(pool)
    .await
    .expect("user insert should succeed")
}
