//! Configuration loading and environment variable handling

use crate::domains::ReportStoreConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "REPORTSTORE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ReportStoreConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ReportStoreConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ReportStoreConfig> {
        let mut config = ReportStoreConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ReportStoreConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ReportStoreConfig) -> ConfigResult<()> {
        self.apply_database_overrides(&mut config.database)?;
        self.apply_blob_storage_overrides(&mut config.blob_storage)?;
        self.apply_migration_overrides(&mut config.migrations)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_database_overrides(
        &self,
        config: &mut crate::domains::database::DatabaseConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("DATABASE_URL") {
            config.url = url;
        }

        if let Ok(name) = self.get_env_var("DATABASE_NAME") {
            config.name = name;
        }

        if let Ok(collection) = self.get_env_var("REPORTS_COLLECTION") {
            config.reports_collection = collection;
        }

        if let Ok(batch_size) = self.get_env_var("BATCH_SIZE") {
            config.batch_size = batch_size
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid BATCH_SIZE: {}", e)))?;
        }

        if let Ok(timeout) = self.get_env_var("CONNECT_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid CONNECT_TIMEOUT: {}", e)))?;
            config.connect_timeout = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    fn apply_blob_storage_overrides(
        &self,
        config: &mut crate::domains::blob_storage::BlobStorageConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("BLOB_STORAGE_URL") {
            config.url = url;
        }

        if let Ok(prefix) = self.get_env_var("BLOB_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        Ok(())
    }

    fn apply_migration_overrides(
        &self,
        config: &mut crate::domains::migrations::MigrationsConfig,
    ) -> ConfigResult<()> {
        if let Ok(field) = self.get_env_var("BACKFILL_FIELD") {
            config.backfill.field = field;
        }

        // Values are parsed as JSON first so numbers and booleans survive;
        // anything that is not JSON is taken as a plain string
        if let Ok(value) = self.get_env_var("BACKFILL_VALUE") {
            let parsed = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            if parsed.is_null() {
                return Err(ConfigError::EnvError("BACKFILL_VALUE must not be null".to_string()));
            }
            config.backfill.value = parsed;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}
