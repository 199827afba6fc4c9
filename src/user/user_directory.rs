use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::Result, user::user_models::UserSummary};

/// Read-only view of user identities used by the messaging core.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_summary(&self, user_id: Uuid) -> Result<Option<UserSummary>>;
}
