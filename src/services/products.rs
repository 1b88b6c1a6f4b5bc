use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::product;
use crate::errors::ServiceError;

/// Identity of a product: the (item, series, category) triple.
///
/// Keys are normalized on construction; two vouchers spelling the same
/// triple with stray whitespace resolve to the same product row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub item: String,
    pub series: String,
    pub category: String,
}

impl ProductKey {
    pub fn new(item: &str, series: &str, category: &str) -> Result<Self, ServiceError> {
        let item = item.trim().to_string();
        let series = series.trim().to_string();
        let category = category.trim().to_string();
        if item.is_empty() || series.is_empty() || category.is_empty() {
            return Err(ServiceError::ValidationError(
                "item, series and category must be non-empty".to_string(),
            ));
        }
        Ok(Self {
            item,
            series,
            category,
        })
    }
}

/// Looks a product up by its triple without creating it.
pub async fn find_by_key<C: ConnectionTrait>(
    db: &C,
    key: &ProductKey,
) -> Result<Option<product::Model>, ServiceError> {
    let found = product::Entity::find()
        .filter(product::Column::Item.eq(key.item.as_str()))
        .filter(product::Column::Series.eq(key.series.as_str()))
        .filter(product::Column::Category.eq(key.category.as_str()))
        .one(db)
        .await?;
    Ok(found)
}

/// Resolves a product that must already exist, as required by sale and
/// transfer postings.
pub async fn resolve_existing<C: ConnectionTrait>(
    db: &C,
    key: &ProductKey,
) -> Result<product::Model, ServiceError> {
    find_by_key(db, key).await?.ok_or_else(|| {
        ServiceError::ProductNotFound(format!(
            "no product for item '{}' series '{}' category '{}'",
            key.item, key.series, key.category
        ))
    })
}

/// Resolves a product by its triple, creating the row if it does not
/// exist yet. Returns the model and whether this call created it.
///
/// The create path races benignly with concurrent postings of the same
/// new triple: the insert is ON CONFLICT DO NOTHING against the unique
/// triple index, and the loser of the race adopts the winner's row on
/// the re-read. Catching a unique-violation error instead would poison
/// the surrounding Postgres transaction.
#[instrument(skip(db))]
pub async fn resolve_or_create<C: ConnectionTrait>(
    db: &C,
    key: &ProductKey,
    origin: Option<&str>,
) -> Result<(product::Model, bool), ServiceError> {
    if let Some(existing) = find_by_key(db, key).await? {
        return Ok((existing, false));
    }

    let candidate_id = Uuid::new_v4();
    let model = product::ActiveModel {
        id: Set(candidate_id),
        item: Set(key.item.clone()),
        series: Set(key.series.clone()),
        category: Set(key.category.clone()),
        origin: Set(origin.map(|o| o.to_string())),
        created_at: Set(Utc::now()),
    };

    product::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                product::Column::Item,
                product::Column::Series,
                product::Column::Category,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let adopted = resolve_existing(db, key).await.map_err(|_| {
        ServiceError::InternalError("product row missing after registry insert".to_string())
    })?;
    let created_here = adopted.id == candidate_id;
    Ok((adopted, created_here))
}

/// Read-side access to the product registry.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let paginator = product::Entity::find()
            .order_by_asc(product::Column::Item)
            .order_by_asc(product::Column::Series)
            .paginate(&*self.db_pool, per_page.clamp(1, 200));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    /// Distinct series names, for catalogue dropdowns.
    pub async fn list_series(&self) -> Result<Vec<String>, ServiceError> {
        let series = product::Entity::find()
            .select_only()
            .column(product::Column::Series)
            .distinct()
            .order_by_asc(product::Column::Series)
            .into_tuple::<String>()
            .all(&*self.db_pool)
            .await?;
        Ok(series)
    }

    /// Distinct category names, for catalogue dropdowns.
    pub async fn list_categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories = product::Entity::find()
            .select_only()
            .column(product::Column::Category)
            .distinct()
            .order_by_asc(product::Column::Category)
            .into_tuple::<String>()
            .all(&*self.db_pool)
            .await?;
        Ok(categories)
    }
}
