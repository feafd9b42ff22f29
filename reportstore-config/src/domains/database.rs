//! Document store configuration

use crate::error::ConfigResult;
use crate::validation::{validate_enum_choice, validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string (e.g., "mongodb://localhost:27017")
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Database name
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Collection holding report documents
    #[serde(default = "default_reports_collection")]
    pub reports_collection: String,

    /// Server selection / connect timeout
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Cursor batch size used by migration queries
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            name: default_database_name(),
            reports_collection: default_reports_collection(),
            connect_timeout: default_connect_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl Validatable for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        let url = validate_url(&self.url, "url", self.domain_name())?;
        validate_enum_choice(url.scheme(), &["mongodb", "mongodb+srv"], "url scheme", self.domain_name())?;
        validate_required_string(&self.name, "name", self.domain_name())?;
        validate_required_string(&self.reports_collection, "reports_collection", self.domain_name())?;
        validate_positive(self.connect_timeout.as_secs(), "connect_timeout", self.domain_name())?;
        validate_positive(self.batch_size, "batch_size", self.domain_name())?;

        if self.reports_collection.starts_with("system.") {
            return Err(self.validation_error("reports_collection cannot be a system collection"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "database"
    }
}

// Default value functions
fn default_database_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database_name() -> String {
    "reporting".to_string()
}

fn default_reports_collection() -> String {
    "reports".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_batch_size() -> u32 {
    500
}
