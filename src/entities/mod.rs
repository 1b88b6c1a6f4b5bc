pub mod product;
pub mod stock_location_total;
pub mod stock_movement;
pub mod stock_size_total;
pub mod stock_total;
pub mod voucher;
pub mod voucher_line;
