use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{product, stock_location_total, stock_size_total, stock_total};
use crate::errors::ServiceError;
use crate::services::products::{self, ProductKey};

/// How much stock information a reader is entitled to see.
///
/// `Internal` is the back-office view with real quantities.
/// `Availability` is the trade-customer view: an in/out flag derived
/// from the total against a threshold, never the number itself.
/// `Hidden` yields an empty listing: such callers get nothing, not a
/// redacted catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockView {
    Internal,
    Availability,
    Hidden,
}

impl StockView {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(StockView::Internal),
            "availability" => Some(StockView::Availability),
            "hidden" => Some(StockView::Hidden),
            _ => None,
        }
    }
}

/// One product in a stock listing, shaped by the requested view.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StockRow {
    Internal {
        product_id: Uuid,
        item: String,
        series: String,
        category: String,
        total_quantity: i64,
        by_location: Vec<LocationQuantity>,
    },
    Availability {
        product_id: Uuid,
        item: String,
        series: String,
        category: String,
        availability: &'static str,
    },
}

/// Full per-product stock breakdown for the internal view.
#[derive(Debug, Clone, Serialize)]
pub struct StockDetail {
    pub item: String,
    pub series: String,
    pub category: String,
    pub total_quantity: i64,
    pub by_location: Vec<LocationQuantity>,
    pub by_size: Vec<SizeQuantity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationQuantity {
    pub location: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SizeQuantity {
    pub size_code: String,
    pub quantity: i64,
}

/// Read-only queries over the derived stock tables. Never touches the
/// ledger; the aggregates are maintained transactionally by the
/// posting path.
#[derive(Clone)]
pub struct StockQueryService {
    db_pool: Arc<DbPool>,
    availability_threshold: i64,
}

impl StockQueryService {
    pub fn new(db_pool: Arc<DbPool>, availability_threshold: i64) -> Self {
        Self {
            db_pool,
            availability_threshold,
        }
    }

    fn availability_label(&self, total: i64) -> &'static str {
        if total > self.availability_threshold {
            "Available"
        } else {
            "Out of stock"
        }
    }

    /// Global total for one product; zero when nothing was ever posted.
    pub async fn current_total(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let total = stock_total::Entity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .map(|t| t.total_quantity)
            .unwrap_or(0);
        Ok(total)
    }

    pub async fn current_by_location(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<LocationQuantity>, ServiceError> {
        let rows = stock_location_total::Entity::find()
            .filter(stock_location_total::Column::ProductId.eq(product_id))
            .order_by_asc(stock_location_total::Column::Location)
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|row| LocationQuantity {
                location: row.location,
                quantity: row.quantity,
            })
            .collect();
        Ok(rows)
    }

    pub async fn current_by_size(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<SizeQuantity>, ServiceError> {
        let rows = stock_size_total::Entity::find()
            .filter(stock_size_total::Column::ProductId.eq(product_id))
            .order_by_asc(stock_size_total::Column::SizeCode)
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|row| SizeQuantity {
                size_code: row.size_code,
                quantity: row.quantity,
            })
            .collect();
        Ok(rows)
    }

    /// Full breakdown for one product addressed by its triple: global
    /// total, per-location split, and the per-size split where one is
    /// tracked.
    #[instrument(skip(self))]
    pub async fn stock_for_product(&self, key: &ProductKey) -> Result<StockDetail, ServiceError> {
        let prod = products::resolve_existing(&*self.db_pool, key).await?;
        self.stock_detail(prod).await
    }

    /// Same breakdown, addressed by product id.
    pub async fn stock_for_product_id(&self, product_id: Uuid) -> Result<StockDetail, ServiceError> {
        let prod = product::Entity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        self.stock_detail(prod).await
    }

    async fn stock_detail(&self, prod: product::Model) -> Result<StockDetail, ServiceError> {
        let total = self.current_total(prod.id).await?;
        let by_location = self.current_by_location(prod.id).await?;
        let by_size = self.current_by_size(prod.id).await?;

        Ok(StockDetail {
            item: prod.item,
            series: prod.series,
            category: prod.category,
            total_quantity: total,
            by_location,
            by_size,
        })
    }

    /// Catalogue-wide stock listing shaped by the caller's view.
    /// Products with no posted movements yet show a zero total; the
    /// hidden view lists nothing at all.
    #[instrument(skip(self))]
    pub async fn list_summary(
        &self,
        view: StockView,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<StockRow>, u64), ServiceError> {
        if view == StockView::Hidden {
            return Ok((Vec::new(), 0));
        }

        let paginator = product::Entity::find()
            .find_also_related(stock_total::Entity)
            .order_by_asc(product::Column::Item)
            .order_by_asc(product::Column::Series)
            .paginate(&*self.db_pool, per_page.clamp(1, 200));
        let total = paginator.num_items().await?;
        let page_rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        // The internal view carries the per-location split; one query
        // for the whole page rather than one per product.
        let mut locations_by_product: HashMap<Uuid, Vec<LocationQuantity>> = HashMap::new();
        if view == StockView::Internal && !page_rows.is_empty() {
            let ids: Vec<Uuid> = page_rows.iter().map(|(prod, _)| prod.id).collect();
            for row in stock_location_total::Entity::find()
                .filter(stock_location_total::Column::ProductId.is_in(ids))
                .order_by_asc(stock_location_total::Column::Location)
                .all(&*self.db_pool)
                .await?
            {
                locations_by_product
                    .entry(row.product_id)
                    .or_default()
                    .push(LocationQuantity {
                        location: row.location,
                        quantity: row.quantity,
                    });
            }
        }

        let mut rows = Vec::with_capacity(page_rows.len());
        for (prod, stock) in page_rows {
            let quantity = stock.map(|s| s.total_quantity).unwrap_or(0);
            let row = if view == StockView::Internal {
                StockRow::Internal {
                    product_id: prod.id,
                    item: prod.item,
                    series: prod.series,
                    category: prod.category,
                    total_quantity: quantity,
                    by_location: locations_by_product.remove(&prod.id).unwrap_or_default(),
                }
            } else {
                StockRow::Availability {
                    product_id: prod.id,
                    item: prod.item,
                    series: prod.series,
                    category: prod.category,
                    availability: self.availability_label(quantity),
                }
            };
            rows.push(row);
        }
        Ok((rows, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_parses_known_names() {
        assert_eq!(StockView::from_str("internal"), Some(StockView::Internal));
        assert_eq!(
            StockView::from_str("availability"),
            Some(StockView::Availability)
        );
        assert_eq!(StockView::from_str("hidden"), Some(StockView::Hidden));
        assert_eq!(StockView::from_str("admin"), None);
    }
}
