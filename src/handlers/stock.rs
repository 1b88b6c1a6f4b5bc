use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::products::ProductKey;
use crate::services::stock_queries::StockView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StockSummaryParams {
    /// One of "internal", "availability", "hidden". Defaults to the
    /// back-office view.
    pub view: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct StockDetailParams {
    pub item: String,
    pub series: String,
    pub category: String,
}

pub async fn stock_summary(
    State(state): State<AppState>,
    Query(params): Query<StockSummaryParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let view = match params.view.as_deref() {
        None => StockView::Internal,
        Some(name) => StockView::from_str(name).ok_or_else(|| {
            ServiceError::ValidationError(format!("unknown stock view '{}'", name))
        })?,
    };
    let (rows, total) = state
        .services
        .stock
        .list_summary(view, params.page, params.per_page)
        .await?;
    Ok(Json(json!({
        "data": rows,
        "page": params.page,
        "per_page": params.per_page,
        "total": total,
    })))
}

pub async fn stock_for_product(
    State(state): State<AppState>,
    Query(params): Query<StockDetailParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let key = ProductKey::new(&params.item, &params.series, &params.category)?;
    let detail = state.services.stock.stock_for_product(&key).await?;
    Ok(Json(json!({ "data": detail })))
}

pub async fn stock_for_product_id(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let detail = state.services.stock.stock_for_product_id(product_id).await?;
    Ok(Json(json!({ "data": detail })))
}

pub async fn stock_sizes_for_product_id(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // 404 for an unknown product id, not an empty size list.
    state.services.products.get_product(product_id).await?;
    let by_size = state.services.stock.current_by_size(product_id).await?;
    Ok(Json(json!({ "data": by_size })))
}
