pub mod cache;
pub mod holidays;
pub mod memory;
pub mod rest;
