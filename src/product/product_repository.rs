use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use super::{product_catalog::ProductCatalog, product_models::ProductSummary};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn find_summary(&self, product_id: Uuid) -> Result<Option<ProductSummary>> {
        let product = sqlx::query_as::<_, ProductSummary>(
            "SELECT id, seller_id, title, category, estimated_size, status
             FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }
}
