pub mod types;

use std::path::Path;

use crate::error::{CalendarError, Result};
use types::{Config, StoreBackend};

/// Overrides `store.api_key` so the key can stay out of `config.yaml`.
pub const API_KEY_ENV: &str = "RENTAL_STORE_API_KEY";

pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yml::from_str::<Config>(&content)?
    } else {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        Config::default()
    };

    apply_env(&mut config, |name| std::env::var(name).ok());
    validate(&config)?;
    Ok(config)
}

fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        tracing::debug!("Store API key taken from {API_KEY_ENV}");
        config.store.api_key = Some(key);
    }
}

/// Reject settings the server cannot run with.
pub fn validate(config: &Config) -> Result<()> {
    if config.store.backend == StoreBackend::Rest {
        url::Url::parse(&config.store.base_url).map_err(|e| {
            CalendarError::Config(format!(
                "store.base_url '{}' is not a valid URL: {e}",
                config.store.base_url
            ))
        })?;
        if config.store.request_timeout_secs == 0 {
            return Err(CalendarError::Config(
                "store.request_timeout_secs must be at least 1".into(),
            ));
        }
    }

    let multipliers = config.pricing.strategies;
    for (name, value) in [
        ("conservative", multipliers.conservative),
        ("balanced", multipliers.balanced),
        ("aggressive", multipliers.aggressive),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(CalendarError::Config(format!(
                "pricing.strategies.{name} must be a positive number, got {value}"
            )));
        }
    }
    if !config.pricing.holiday_boost.is_finite() || config.pricing.holiday_boost < 0.0 {
        return Err(CalendarError::Config(format!(
            "pricing.holiday_boost must be zero or more, got {}",
            config.pricing.holiday_boost
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn yaml_file(content: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "{content}").unwrap();
        tmp
    }

    #[test]
    fn missing_file_gives_memory_backend() {
        let config = load_config(Path::new("/tmp/nonexistent_rental_config_12345.yaml")).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn rest_backend_settings() {
        let tmp = yaml_file(
            "store:\n  backend: rest\n  base_url: \"https://db.example.com\"\n  api_key: \"anon\"\ncache:\n  max_entries: 50",
        );
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Rest);
        assert_eq!(config.store.base_url, "https://db.example.com");
        assert_eq!(config.cache.max_entries, 50);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = yaml_file("pricing:\n  holidays: [\"2027-04-02\", \"12-25\"]");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.pricing.holidays, vec!["2027-04-02", "12-25"]);
        assert!((config.pricing.holiday_boost - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.store.tables.bookings, "bookings");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let tmp = yaml_file("");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.cache.max_entries, 500);
        assert!(!config.pricing.holidays.is_empty());
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let tmp = yaml_file("{{{{invalid yaml: [[[");
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn env_key_replaces_file_key() {
        let mut config = Config::default();
        config.store.api_key = Some("from-file".into());
        apply_env(&mut config, |name| {
            (name == API_KEY_ENV).then(|| "from-env".to_string())
        });
        assert_eq!(config.store.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn blank_env_key_is_ignored() {
        let mut config = Config::default();
        config.store.api_key = Some("from-file".into());
        apply_env(&mut config, |_| Some("  ".to_string()));
        assert_eq!(config.store.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn rest_backend_needs_valid_url() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Rest;
        config.store.base_url = "not a url".into();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("store.base_url"));
    }

    #[test]
    fn memory_backend_ignores_url() {
        let mut config = Config::default();
        config.store.base_url = "not a url".into();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn non_positive_multiplier_is_rejected() {
        let mut config = Config::default();
        config.pricing.strategies.aggressive = 0.0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("aggressive"));
    }

    #[test]
    fn negative_holiday_boost_is_rejected() {
        let mut config = Config::default();
        config.pricing.holiday_boost = -0.1;
        assert!(validate(&config).is_err());
    }
}
