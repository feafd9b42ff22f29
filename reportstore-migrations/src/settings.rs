//! Settings shared by the migrations

use reportstore_config::ReportStoreConfig;
use reportstore_storage::FindOptions;
use serde_json::Value;

/// Values migrations read from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationSettings {
    /// Collection holding the report documents
    pub reports_collection: String,
    /// Documents fetched per cursor round trip
    pub batch_size: u32,
    /// Key inside `metadata` written by the backfill
    pub backfill_field: String,
    pub backfill_value: Value,
}

impl MigrationSettings {
    pub fn from_config(config: &ReportStoreConfig) -> Self {
        Self {
            reports_collection: config.database.reports_collection.clone(),
            batch_size: config.database.batch_size,
            backfill_field: config.migrations.backfill.field.clone(),
            backfill_value: config.migrations.backfill.value.clone(),
        }
    }

    pub(crate) fn find_options(&self) -> FindOptions {
        FindOptions::new().with_batch_size(self.batch_size)
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self::from_config(&ReportStoreConfig::default())
    }
}
