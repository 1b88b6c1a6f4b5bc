use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::vouchers::{PostIncomingRequest, PostSaleRequest, PostTransferRequest};
use crate::AppState;

pub async fn post_incoming(
    State(state): State<AppState>,
    Json(request): Json<PostIncomingRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let receipt = state.services.vouchers.post_incoming(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": receipt }))))
}

pub async fn post_sale(
    State(state): State<AppState>,
    Json(request): Json<PostSaleRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let receipt = state.services.vouchers.post_sale(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": receipt }))))
}

pub async fn post_transfer(
    State(state): State<AppState>,
    Json(request): Json<PostTransferRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let receipt = state.services.vouchers.post_transfer(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": receipt }))))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let (header, lines) = state.services.vouchers.get_voucher(id).await?;
    Ok(Json(json!({ "data": { "voucher": header, "lines": lines } })))
}

pub async fn get_voucher_movements(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    // 404 for an unknown voucher rather than an empty list.
    state.services.vouchers.get_voucher(id).await?;
    let rows = state.services.movements.movements_for_voucher(id).await?;
    Ok(Json(json!({ "data": rows })))
}
