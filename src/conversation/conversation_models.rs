use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DIRECT: &str = "direct";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub conversation_type: String,
    pub product_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub last_read_message_id: Option<Uuid>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub muted: bool,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Identity of a direct conversation: the unordered user pair plus the
/// optional product it is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectKey {
    low: Uuid,
    high: Uuid,
    product_id: Option<Uuid>,
}

impl DirectKey {
    pub fn new(a: Uuid, b: Uuid, product_id: Option<Uuid>) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self { low, high, product_id }
    }

    pub fn users(&self) -> (Uuid, Uuid) {
        (self.low, self.high)
    }

    pub fn product_id(&self) -> Option<Uuid> {
        self.product_id
    }
}

impl fmt::Display for DirectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.product_id {
            Some(product_id) => write!(f, "{}:{}:{}", self.low, self.high, product_id),
            None => write!(f, "{}:{}:-", self.low, self.high),
        }
    }
}
