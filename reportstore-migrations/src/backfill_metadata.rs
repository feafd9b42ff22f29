//! Add a configured metadata entry to reports that lack it

use async_trait::async_trait;
use reportstore_storage::{
    document::{ReportDocument, METADATA_FIELD},
    Database, Filter, FindOptions, OperationContext, UpdateOperation,
};
use serde_json::Value;
use tracing::info;

use crate::{
    cursor::DocumentCursor, error::MigrationError, settings::MigrationSettings, Migration, MigrationResult,
};

/// Sets `metadata.<field>` on every report missing it, in a single bulk write
pub struct BackfillMetadata {
    collection: String,
    field_path: String,
    value: Value,
    options: FindOptions,
}

impl BackfillMetadata {
    pub fn new(settings: &MigrationSettings) -> Self {
        Self {
            collection: settings.reports_collection.clone(),
            field_path: format!("{}.{}", METADATA_FIELD, settings.backfill_field),
            value: settings.backfill_value.clone(),
            options: settings.find_options(),
        }
    }

    /// Dotted path of the field being backfilled
    pub fn field_path(&self) -> &str {
        &self.field_path
    }
}

#[async_trait]
impl Migration for BackfillMetadata {
    fn id(&self) -> &str {
        "backfill_metadata"
    }

    fn description(&self) -> &str {
        "Add the default metadata entry to reports missing it"
    }

    async fn run(&self, ctx: &OperationContext, db: &dyn Database) -> MigrationResult<()> {
        let reports = db.collection(&self.collection);
        let mut cursor = DocumentCursor::<ReportDocument>::open(
            ctx,
            reports.as_ref(),
            &Filter::missing(self.field_path.as_str()),
            &self.options,
        )
        .await?;

        let mut operations = Vec::new();
        while cursor.advance(ctx).await? {
            let report = cursor.decode_current()?;
            operations.push(UpdateOperation::for_id(report.id).set(self.field_path.as_str(), self.value.clone()));
        }

        let queued = operations.len();
        let result = reports
            .bulk_write(ctx, operations)
            .await
            .map_err(MigrationError::write)?;

        info!(
            migration = self.id(),
            field = %self.field_path,
            queued,
            modified = result.modified_count,
            "backfilled report metadata"
        );
        Ok(())
    }
}
