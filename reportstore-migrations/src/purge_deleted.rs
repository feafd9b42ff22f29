//! Remove reports flagged as deleted

use async_trait::async_trait;
use reportstore_storage::{
    document::{ReportId, DELETED_FIELD, ID_FIELD},
    Database, Filter, FindOptions, OperationContext,
};
use tracing::info;

use crate::{
    cursor::DocumentCursor, error::MigrationError, settings::MigrationSettings, Migration, MigrationResult,
};

/// Collects the ids of every deleted report, then removes them in one delete
pub struct PurgeDeleted {
    collection: String,
    options: FindOptions,
}

impl PurgeDeleted {
    pub fn new(settings: &MigrationSettings) -> Self {
        Self {
            collection: settings.reports_collection.clone(),
            options: settings.find_options().with_projection([ID_FIELD]),
        }
    }
}

#[async_trait]
impl Migration for PurgeDeleted {
    fn id(&self) -> &str {
        "purge_deleted"
    }

    fn description(&self) -> &str {
        "Delete reports whose deletion marker is set"
    }

    async fn run(&self, ctx: &OperationContext, db: &dyn Database) -> MigrationResult<()> {
        let reports = db.collection(&self.collection);
        let mut cursor =
            DocumentCursor::<ReportId>::open(ctx, reports.as_ref(), &Filter::eq(DELETED_FIELD, true), &self.options)
                .await?;

        let mut ids = Vec::new();
        while cursor.advance(ctx).await? {
            ids.push(cursor.decode_current()?.id);
        }

        let candidates = ids.len();
        // Issued even when nothing is flagged; an empty id set deletes nothing
        let result = reports
            .delete_many(ctx, &Filter::in_values(ID_FIELD, ids))
            .await
            .map_err(MigrationError::write)?;

        info!(
            migration = self.id(),
            candidates,
            deleted = result.deleted_count,
            "purged deleted reports"
        );
        Ok(())
    }
}
