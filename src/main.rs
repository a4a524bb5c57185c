use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use mcp_rental_calendar::adapters::cache::memory_cache::MemoryCache;
use mcp_rental_calendar::adapters::holidays::ConfiguredHolidays;
use mcp_rental_calendar::adapters::memory::store::{MemoryStore, SeedData};
use mcp_rental_calendar::adapters::rest::client::RestStore;
use mcp_rental_calendar::config::load_config;
use mcp_rental_calendar::config::types::{Config, StoreBackend};
use mcp_rental_calendar::desk::PricingDesk;
use mcp_rental_calendar::domain::simulation::SimulationSettings;
use mcp_rental_calendar::mcp::server::RentalCalendarMcpServer;
use mcp_rental_calendar::ports::cache::RecordCache;
use mcp_rental_calendar::ports::store::PricingStore;

const CONFIG_PATH_ENV: &str = "RENTAL_CONFIG";

fn find_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    let candidates = [PathBuf::from("config.yaml"), binary_dir().join("config.yaml")];
    candidates
        .iter()
        .find(|path| path.exists())
        .unwrap_or(&candidates[0])
        .clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn build_store(config: &Config) -> Result<Arc<dyn PricingStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            let store = match &config.store.seed_path {
                Some(path) => {
                    let seed = SeedData::load(Path::new(path))
                        .with_context(|| format!("loading seed data from {path}"))?;
                    tracing::info!(
                        path,
                        properties = seed.properties.len(),
                        "Using in-memory store with seed data"
                    );
                    MemoryStore::from_seed(seed)
                }
                None => {
                    tracing::warn!("Using an empty in-memory store; set store.seed_path to load data");
                    MemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
        StoreBackend::Rest => {
            tracing::info!(base_url = %config.store.base_url, "Using REST store");
            let cache: Arc<dyn RecordCache> = Arc::new(MemoryCache::new(config.cache.max_entries));
            let store = RestStore::new(&config.store, &config.cache, cache)
                .context("building HTTP client for the REST store")?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries MCP JSON-RPC, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting mcp-rental-calendar server");

    let config_path = find_config_path();
    let config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let store = build_store(&config)?;
    let holidays = ConfiguredHolidays::from_entries(&config.pricing.holidays)?;
    if holidays.is_empty() {
        tracing::warn!("No holidays configured, simulations will not apply holiday pricing");
    }
    let desk = PricingDesk::new(
        store,
        Arc::new(holidays),
        SimulationSettings::from(&config.pricing),
    );

    let server = RentalCalendarMcpServer::new(Arc::new(desk));

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
