//! Per-migration settings

use crate::error::ConfigResult;
use crate::validation::{validate_field_name, Validatable};
use serde::{Deserialize, Serialize};

/// Settings consumed by individual migrations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Metadata backfill
    #[serde(default)]
    pub backfill: BackfillConfig,
}

/// Metadata field written onto reports that lack it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    /// Key inside the report `metadata` mapping
    #[serde(default = "default_backfill_field")]
    pub field: String,

    /// Value written for reports missing the key
    #[serde(default = "default_backfill_value")]
    pub value: serde_json::Value,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            field: default_backfill_field(),
            value: default_backfill_value(),
        }
    }
}

impl Validatable for MigrationsConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.backfill.validate()
    }

    fn domain_name(&self) -> &'static str {
        "migrations"
    }
}

impl Validatable for BackfillConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_field_name(&self.field, "field", self.domain_name())?;

        if self.value.is_null() {
            return Err(self.validation_error("value cannot be null"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "migrations.backfill"
    }
}

fn default_backfill_field() -> String {
    "retention_policy".to_string()
}

fn default_backfill_value() -> serde_json::Value {
    serde_json::Value::String("standard".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backfill_defaults() {
        let config = BackfillConfig::default();
        assert_eq!(config.field, "retention_policy");
        assert_eq!(config.value, json!("standard"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backfill_rejects_null_value() {
        let config = BackfillConfig {
            value: serde_json::Value::Null,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
