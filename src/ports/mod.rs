pub mod cache;
pub mod holidays;
pub mod store;
