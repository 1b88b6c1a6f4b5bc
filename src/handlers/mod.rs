use serde::Deserialize;

use crate::services::movements::MovementService;
use crate::services::products::ProductService;
use crate::services::stock_queries::StockQueryService;
use crate::services::vouchers::VoucherService;

pub mod movements;
pub mod products;
pub mod stock;
pub mod vouchers;

/// Service handles shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    pub products: ProductService,
    pub movements: MovementService,
    pub vouchers: VoucherService,
    pub stock: StockQueryService,
}

/// Common pagination query parameters. Pages are 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
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

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}
