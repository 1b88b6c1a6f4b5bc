use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::PaginationParams;
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (products, total) = state
        .services
        .products
        .list_products(pagination.page, pagination.per_page)
        .await?;
    Ok(Json(json!({
        "data": products,
        "page": pagination.page,
        "per_page": pagination.per_page,
        "total": total,
    })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(json!({ "data": product })))
}

pub async fn list_series(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let series = state.services.products.list_series().await?;
    Ok(Json(json!({ "data": series })))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let categories = state.services.products.list_categories().await?;
    Ok(Json(json!({ "data": categories })))
}
