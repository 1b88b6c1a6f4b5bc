use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::json;

use crate::errors::ServiceError;
use crate::handlers::PaginationParams;
use crate::AppState;

pub async fn movements_for_item(
    State(state): State<AppState>,
    Path(item): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (movements, total) = state
        .services
        .movements
        .movements_for_item(&item, pagination.page, pagination.per_page)
        .await?;
    Ok(Json(json!({
        "data": movements,
        "page": pagination.page,
        "per_page": pagination.per_page,
        "total": total,
    })))
}
