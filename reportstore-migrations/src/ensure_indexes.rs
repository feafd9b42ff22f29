//! Create the indexes the report collection relies on

use async_trait::async_trait;
use reportstore_storage::{
    document::{DELETED_FIELD, ID_FIELD, NAME_FIELD},
    Database, IndexSpecification, OperationContext,
};
use tracing::{debug, info};

use crate::{error::MigrationError, settings::MigrationSettings, Migration, MigrationResult};

/// Indexes every report collection must carry, in creation order
pub fn required_indexes() -> Vec<IndexSpecification> {
    vec![
        IndexSpecification::new("report_id_unique").ascending(ID_FIELD).unique(),
        IndexSpecification::new("report_name").ascending(NAME_FIELD),
        IndexSpecification::new("report_deleted").ascending(DELETED_FIELD),
    ]
}

pub struct EnsureIndexes {
    collection: String,
    indexes: Vec<IndexSpecification>,
}

impl EnsureIndexes {
    pub fn new(settings: &MigrationSettings) -> Self {
        Self {
            collection: settings.reports_collection.clone(),
            indexes: required_indexes(),
        }
    }
}

#[async_trait]
impl Migration for EnsureIndexes {
    fn id(&self) -> &str {
        "ensure_indexes"
    }

    fn description(&self) -> &str {
        "Create the indexes required on the reports collection"
    }

    async fn run(&self, ctx: &OperationContext, db: &dyn Database) -> MigrationResult<()> {
        let reports = db.collection(&self.collection);
        let mut created = 0;

        for spec in &self.indexes {
            let exists = reports.index_exists(ctx, spec).await.map_err(MigrationError::query)?;
            if exists {
                debug!(migration = self.id(), index = %spec.name, "index already present");
                continue;
            }

            reports.create_index(ctx, spec).await.map_err(MigrationError::write)?;
            info!(migration = self.id(), index = %spec.name, unique = spec.unique, "created index");
            created += 1;
        }

        info!(migration = self.id(), created, required = self.indexes.len(), "indexes ensured");
        Ok(())
    }
}
