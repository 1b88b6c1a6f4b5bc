pub mod movements;
pub mod products;
pub mod stock_levels;
pub mod stock_queries;
pub mod vouchers;
