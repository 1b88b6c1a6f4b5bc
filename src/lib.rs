pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::handlers::AppServices;
use crate::services::movements::MovementService;
use crate::services::products::ProductService;
use crate::services::stock_queries::StockQueryService;
use crate::services::vouchers::VoucherService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<AppServices>,
    pub db_pool: Arc<DbPool>,
}

impl AppState {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let event_sender = Arc::new(event_sender);
        let services = AppServices {
            products: ProductService::new(db_pool.clone()),
            movements: MovementService::new(db_pool.clone()),
            vouchers: VoucherService::new(
                db_pool.clone(),
                event_sender,
                config.online_location.clone(),
            ),
            stock: StockQueryService::new(db_pool.clone(), config.availability_threshold),
        };
        Self {
            services: Arc::new(services),
            db_pool,
        }
    }
}

/// Builds the full application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/vouchers/incoming", post(handlers::vouchers::post_incoming))
        .route("/vouchers/sale", post(handlers::vouchers::post_sale))
        .route("/vouchers/transfer", post(handlers::vouchers::post_transfer))
        .route("/vouchers/{id}", get(handlers::vouchers::get_voucher))
        .route(
            "/vouchers/{id}/movements",
            get(handlers::vouchers::get_voucher_movements),
        )
        .route("/products", get(handlers::products::list_products))
        .route("/products/{id}", get(handlers::products::get_product))
        .route("/series", get(handlers::products::list_series))
        .route("/categories", get(handlers::products::list_categories))
        .route("/stock", get(handlers::stock::stock_summary))
        .route("/stock/product", get(handlers::stock::stock_for_product))
        .route("/stock/{id}", get(handlers::stock::stock_for_product_id))
        .route(
            "/stock/{id}/sizes",
            get(handlers::stock::stock_sizes_for_product_id),
        )
        .route(
            "/items/{item}/movements",
            get(handlers::movements::movements_for_item),
        )
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match db::check_connection(&state.db_pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "up" })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "down" })),
            )
        }
    }
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
