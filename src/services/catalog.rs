use std::sync::Arc;

use sea_orm::EntityTrait;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::product::{Entity as ProductEntity, Model as ProductModel};
use crate::errors::ServiceError;

/// Catalog lookup collaborator. Order creation resolves optional product
/// references through here; an unknown id is a hard input error upstream.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DbPool>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn find(&self, product_id: Uuid) -> Result<Option<ProductModel>, ServiceError> {
        let product = ProductEntity::find_by_id(product_id).one(&*self.db).await?;
        Ok(product)
    }
}
