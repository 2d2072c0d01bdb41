use crate::error::Result;
use crate::indexing::IndexerConfig;
use crate::search::SearchConfig;
use crate::settings::{EventSettings, PartitionConfig, SettingsValidator};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Environment variable naming an override configuration file
pub const CONFIG_PATH_ENV: &str = "EVENT_INDEXER_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search index configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Queue drain configuration
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Partitioning of the archive and occurrence tables
    #[serde(default)]
    pub partitions: PartitionConfig,

    /// Initial event settings
    #[serde(default)]
    pub events: EventSettings,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/event-indexer".to_string());

        let config: Config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: EVENT_INDEXER_)
            .add_source(
                config::Environment::with_prefix("EVENT_INDEXER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check every section, including event settings against partition bounds
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.indexer.validate()?;
        self.partitions.validate()?;
        SettingsValidator::new(&self.partitions).validate(&self.events)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "event-indexer".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_bundled_defaults_deserialize() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.indexer.batch_limit, 1000);
        assert_eq!(config.search.max_results, 100);
        assert_eq!(config.observability.service_name, "event-indexer");
        assert_eq!(config.partitions.event_archive.max_purge_days(), 1000);
    }

    #[test]
    fn test_events_checked_against_partitions() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.events.event_occurrence_purge_interval_days = 100;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_invalid_indexer_section() {
        let mut config = Config::default();
        config.indexer.batch_limit = 0;
        assert!(config.validate().is_err());
    }
}
