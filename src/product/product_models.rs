use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const STATUS_ACTIVE: &str = "active";

/// The slice of a listing that conversations reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub category: String,
    pub estimated_size: Option<String>,
    pub status: String,
}

impl ProductSummary {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}
