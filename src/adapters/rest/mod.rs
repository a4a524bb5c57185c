pub mod client;
pub mod rows;
