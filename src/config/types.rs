use serde::{Deserialize, Serialize};

use crate::domain::simulation::{DEFAULT_HOLIDAY_BOOST, SimulationSettings, StrategyMultipliers};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Rest,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// YAML file with properties, bookings and prices loaded into the memory backend.
    #[serde(default)]
    pub seed_path: Option<String>,
    #[serde(default)]
    pub tables: TableNames,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            base_url: default_base_url(),
            api_key: None,
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
            seed_path: None,
            tables: TableNames::default(),
        }
    }
}

/// Table names exposed by the managed database's REST endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableNames {
    #[serde(default = "default_properties_table")]
    pub properties: String,
    #[serde(default = "default_bookings_table")]
    pub bookings: String,
    #[serde(default = "default_daily_prices_table")]
    pub daily_prices: String,
    #[serde(default = "default_discounts_table")]
    pub discounts: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            properties: default_properties_table(),
            bookings: default_bookings_table(),
            daily_prices: default_daily_prices_table(),
            discounts: default_discounts_table(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_property_ttl")]
    pub property_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            property_ttl_secs: default_property_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub strategies: StrategyMultipliers,
    /// Added to the strategy multiplier on holidays.
    #[serde(default = "default_holiday_boost")]
    pub holiday_boost: f64,
    /// `YYYY-MM-DD` for a one-off date, `MM-DD` for a date that repeats every year.
    #[serde(default = "default_holidays")]
    pub holidays: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyMultipliers::default(),
            holiday_boost: default_holiday_boost(),
            holidays: default_holidays(),
        }
    }
}

impl From<&PricingConfig> for SimulationSettings {
    fn from(config: &PricingConfig) -> Self {
        Self {
            multipliers: config.strategies,
            holiday_boost: config.holiday_boost,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:54321".into()
}

fn default_user_agent() -> String {
    concat!("mcp-rental-calendar/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout() -> u64 {
    15
}

fn default_properties_table() -> String {
    "properties".into()
}

fn default_bookings_table() -> String {
    "bookings".into()
}

fn default_daily_prices_table() -> String {
    "property_daily_prices".into()
}

fn default_discounts_table() -> String {
    "property_discounts".into()
}

fn default_max_entries() -> usize {
    500
}

fn default_property_ttl() -> u64 {
    300
}

fn default_holiday_boost() -> f64 {
    DEFAULT_HOLIDAY_BOOST
}

fn default_holidays() -> Vec<String> {
    ["01-01", "02-14", "07-04", "10-31", "12-24", "12-25", "12-31"]
        .into_iter()
        .map(String::from)
        .collect()
}
