//! Domain-specific configuration modules

pub mod blob_storage;
pub mod database;
pub mod logging;
pub mod migrations;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportStoreConfig {
    /// Document store configuration
    #[serde(default)]
    pub database: database::DatabaseConfig,

    /// External object storage configuration
    #[serde(default)]
    pub blob_storage: blob_storage::BlobStorageConfig,

    /// Per-migration settings
    #[serde(default)]
    pub migrations: migrations::MigrationsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl ReportStoreConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.blob_storage.validate()?;
        self.migrations.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = ReportStoreConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
