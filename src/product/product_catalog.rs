use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::Result, product::product_models::ProductSummary};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_summary(&self, product_id: Uuid) -> Result<Option<ProductSummary>>;
}
