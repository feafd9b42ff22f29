//! Data migrations for the report document store
//!
//! Each migration is a single async entry point run against a
//! [`Database`] handle. Migrations stop at the first failure and report it
//! as a [`MigrationError`] tagged query, decode or write; nothing is retried.
//!
//! - [`EnsureIndexes`] creates the indexes the report collection relies on
//! - [`PurgeDeleted`] removes reports flagged as deleted
//! - [`BackfillMetadata`] adds a configured metadata entry to reports lacking it
//! - [`RelocateAttachments`] moves embedded attachment payloads to object storage

use async_trait::async_trait;
use reportstore_storage::{Database, OperationContext};

pub mod backfill_metadata;
pub mod cursor;
pub mod ensure_indexes;
pub mod error;
pub mod purge_deleted;
pub mod relocate_attachments;
pub mod settings;

pub use backfill_metadata::BackfillMetadata;
pub use cursor::DocumentCursor;
pub use ensure_indexes::{required_indexes, EnsureIndexes};
pub use error::{DecodeError, MigrationError, MigrationResult};
pub use purge_deleted::PurgeDeleted;
pub use relocate_attachments::RelocateAttachments;
pub use settings::MigrationSettings;

/// A data migration over the report store
#[async_trait]
pub trait Migration: Send + Sync {
    /// Get migration ID (unique identifier)
    fn id(&self) -> &str;

    /// Get migration description
    fn description(&self) -> &str;

    /// Execute the migration
    async fn run(&self, ctx: &OperationContext, db: &dyn Database) -> MigrationResult<()>;
}

/// Every migration, in the order they are meant to run
pub fn default_migrations(settings: &MigrationSettings) -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(EnsureIndexes::new(settings)),
        Box::new(PurgeDeleted::new(settings)),
        Box::new(BackfillMetadata::new(settings)),
        Box::new(RelocateAttachments::new(settings)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_migrations_order() {
        let migrations = default_migrations(&MigrationSettings::default());
        let ids: Vec<&str> = migrations.iter().map(|m| m.id()).collect();
        assert_eq!(
            ids,
            vec!["ensure_indexes", "purge_deleted", "backfill_metadata", "relocate_attachments"]
        );
        assert!(migrations.iter().all(|m| !m.description().is_empty()));
    }
}
