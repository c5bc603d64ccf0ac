pub mod entry;
pub mod logged_price;
pub mod record;
