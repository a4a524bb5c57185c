pub mod adapters;
pub mod config;
pub mod desk;
pub mod domain;
pub mod error;
pub mod mcp;
pub mod ports;

#[cfg(test)]
pub mod test_helpers;
