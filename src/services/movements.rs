use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::stock_movement::{self, MovementDirection};
use crate::errors::ServiceError;

/// A movement about to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub voucher_id: Uuid,
    pub direction: MovementDirection,
    pub item: String,
    pub series: String,
    pub category: String,
    pub quantity: i64,
    pub location: String,
    pub posted_by: String,
}

/// Appends one movement row. The ledger is insert-only; this is the
/// single write path into it.
pub async fn append<C: ConnectionTrait>(
    db: &C,
    movement: NewMovement,
) -> Result<stock_movement::Model, ServiceError> {
    if movement.quantity <= 0 {
        return Err(ServiceError::InvariantViolation(format!(
            "movement quantity must be positive, got {}",
            movement.quantity
        )));
    }

    let model = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        voucher_id: Set(movement.voucher_id),
        direction: Set(movement.direction.as_str().to_string()),
        item: Set(movement.item),
        series: Set(movement.series),
        category: Set(movement.category),
        quantity: Set(movement.quantity),
        location: Set(movement.location),
        posted_by: Set(movement.posted_by),
        ..Default::default()
    };
    let inserted = model.insert(db).await?;
    Ok(inserted)
}

/// Read-side access to the movement ledger.
#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
}

impl MovementService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Movement history for one item code in ledger order, oldest
    /// first. Each call re-reads the current committed state.
    #[instrument(skip(self))]
    pub async fn movements_for_item(
        &self,
        item: &str,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let paginator = stock_movement::Entity::find()
            .filter(stock_movement::Column::Item.eq(item))
            .order_by_asc(stock_movement::Column::OccurredAt)
            .paginate(&*self.db_pool, per_page.clamp(1, 200));
        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((movements, total))
    }

    /// All movements written by one voucher. A transfer shows both its
    /// out leg and its in leg here.
    pub async fn movements_for_voucher(
        &self,
        voucher_id: Uuid,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let movements = stock_movement::Entity::find()
            .filter(stock_movement::Column::VoucherId.eq(voucher_id))
            .order_by_asc(stock_movement::Column::OccurredAt)
            .all(&*self.db_pool)
            .await?;
        Ok(movements)
    }
}
