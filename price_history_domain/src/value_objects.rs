pub mod decimal;
pub mod filename;
pub mod product_id;
