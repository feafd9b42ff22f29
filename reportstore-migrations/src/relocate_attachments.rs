//! Move embedded attachment payloads into external object storage

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reportstore_storage::{
    document::{ReportDocument, ATTACHMENT_DATA_FIELD, ATTACHMENT_EXTERNAL_KEY_FIELD, ATTACHMENT_SIZE_FIELD},
    Database, Filter, FindOptions, ObjectKey, OperationContext, UpdateOperation,
};
use tracing::{debug, info};

use crate::{
    cursor::DocumentCursor,
    error::{DecodeError, MigrationError},
    settings::MigrationSettings,
    Migration, MigrationResult,
};

/// Uploads each embedded payload, then rewrites that report to reference it
///
/// Reports are written back one at a time, so a failed run leaves the
/// reports handled before the failure relocated. They no longer match the
/// query and are skipped when the migration is run again.
pub struct RelocateAttachments {
    collection: String,
    options: FindOptions,
}

impl RelocateAttachments {
    pub fn new(settings: &MigrationSettings) -> Self {
        Self {
            collection: settings.reports_collection.clone(),
            options: settings.find_options(),
        }
    }
}

/// Object key for a report's attachment: one segment for the report id, one for the file name
pub fn attachment_key(report_id: &str, file_name: &str) -> Result<ObjectKey, DecodeError> {
    ObjectKey::new([report_id, file_name]).map_err(|e| DecodeError::Payload {
        id: report_id.to_string(),
        reason: e.to_string(),
    })
}

/// Decode the embedded payload of a report
fn embedded_payload(report: &ReportDocument) -> Result<(ObjectKey, Vec<u8>), DecodeError> {
    let attachment = report.attachment.as_ref().ok_or_else(|| DecodeError::Payload {
        id: report.id.clone(),
        reason: "report has no attachment".to_string(),
    })?;
    let data = attachment.data.as_deref().ok_or_else(|| DecodeError::Payload {
        id: report.id.clone(),
        reason: "attachment has no embedded data".to_string(),
    })?;

    let payload = STANDARD.decode(data).map_err(|e| DecodeError::Payload {
        id: report.id.clone(),
        reason: e.to_string(),
    })?;
    Ok((attachment_key(&report.id, &attachment.file_name)?, payload))
}

#[async_trait]
impl Migration for RelocateAttachments {
    fn id(&self) -> &str {
        "relocate_attachments"
    }

    fn description(&self) -> &str {
        "Move embedded attachment payloads to object storage"
    }

    async fn run(&self, ctx: &OperationContext, db: &dyn Database) -> MigrationResult<()> {
        let reports = db.collection(&self.collection);
        let mut cursor = DocumentCursor::<ReportDocument>::open(
            ctx,
            reports.as_ref(),
            &Filter::is_string(ATTACHMENT_DATA_FIELD),
            &self.options,
        )
        .await?;

        let mut relocated = 0;
        while cursor.advance(ctx).await? {
            let report = cursor.decode_current()?;
            let (key, payload) = embedded_payload(&report)?;
            let size = payload.len() as u64;

            reports
                .upload_external(ctx, &key, Bytes::from(payload))
                .await
                .map_err(MigrationError::write)?;

            let external_key = key.to_string();
            let update = UpdateOperation::for_id(report.id.as_str())
                .set(ATTACHMENT_EXTERNAL_KEY_FIELD, external_key.as_str())
                .set(ATTACHMENT_SIZE_FIELD, size)
                .unset(ATTACHMENT_DATA_FIELD);
            reports
                .bulk_write(ctx, vec![update])
                .await
                .map_err(MigrationError::write)?;

            debug!(migration = self.id(), report = %report.id, key = %external_key, size, "relocated attachment");
            relocated += 1;
        }

        info!(migration = self.id(), relocated, "relocated attachments");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use reportstore_storage::testing::{attached_report, database_with, mock_cursor, MockCollection, MockRecordCursor};
    use reportstore_storage::{BulkWriteResult, Cursor, StorageError, StorageResult};
    use serde_json::{json, Value};

    fn boxed(cursor: MockRecordCursor) -> StorageResult<Box<dyn Cursor>> {
        Ok(Box::new(cursor))
    }

    fn collection_yielding(records: Vec<StorageResult<Value>>) -> MockCollection {
        let mut collection = MockCollection::new();
        collection
            .expect_find()
            .withf(|_, filter, _| *filter == Filter::is_string("attachment.data"))
            .times(1)
            .return_once(move |_, _, _| boxed(mock_cursor(records)));
        collection
    }

    async fn run_with(collection: MockCollection) -> MigrationResult<()> {
        let db = database_with(collection);
        RelocateAttachments::new(&MigrationSettings::default())
            .run(&OperationContext::new(), &db)
            .await
    }

    fn write_back(id: &str, key: &str, size: u64) -> UpdateOperation {
        UpdateOperation::for_id(id)
            .set("attachment.external_key", key)
            .set("attachment.size_bytes", size)
            .unset("attachment.data")
    }

    #[test]
    fn test_embedded_payload() {
        let report = ReportDocument::new("r1", "Q1")
            .with_attachment(reportstore_storage::Attachment::embedded("q1.pdf", "JVBERi0xLjc="));
        let (key, payload) = embedded_payload(&report).unwrap();
        assert_eq!(key.to_string(), "r1/q1.pdf");
        assert_eq!(payload, b"%PDF-1.7");

        let bare = ReportDocument::new("r2", "Q2");
        assert!(matches!(embedded_payload(&bare), Err(DecodeError::Payload { ref id, .. }) if id == "r2"));

        let unnamed = ReportDocument::new("r3", "Q3")
            .with_attachment(reportstore_storage::Attachment::embedded("", "JVBERi0xLjc="));
        assert!(matches!(embedded_payload(&unnamed), Err(DecodeError::Payload { ref id, .. }) if id == "r3"));
    }

    #[test]
    fn test_keys_with_slashes_stay_distinct() {
        let nested_name = attachment_key("a", "b/c.pdf").unwrap();
        let nested_id = attachment_key("a/b", "c.pdf").unwrap();
        assert_ne!(nested_name, nested_id);
        assert_ne!(nested_name.to_string(), nested_id.to_string());
        assert_eq!(nested_id.to_string(), "a%2Fb/c.pdf");
    }

    #[tokio::test]
    async fn test_uploads_then_writes_back_each_report() {
        let mut seq = Sequence::new();
        let mut collection = collection_yielding(vec![
            Ok(attached_report("r1", "q1.pdf", "JVBERi0xLjc=")),
            Ok(attached_report("r2", "data.csv", "YSxiCjEsMgo=")),
        ]);
        collection
            .expect_upload_external()
            .withf(|_, key, payload| key.segments() == ["r1", "q1.pdf"] && &payload[..] == b"%PDF-1.7")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        collection
            .expect_bulk_write()
            .withf(|_, operations| *operations == vec![write_back("r1", "r1/q1.pdf", 8)])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(BulkWriteResult { matched_count: 1, modified_count: 1 }));
        collection
            .expect_upload_external()
            .withf(|_, key, payload| key.segments() == ["r2", "data.csv"] && &payload[..] == b"a,b\n1,2\n")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        collection
            .expect_bulk_write()
            .withf(|_, operations| *operations == vec![write_back("r2", "r2/data.csv", 8)])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(BulkWriteResult { matched_count: 1, modified_count: 1 }));

        assert_eq!(run_with(collection).await, Ok(()));
    }

    #[tokio::test]
    async fn test_nothing_embedded_writes_nothing() {
        let mut collection = collection_yielding(vec![]);
        collection.expect_upload_external().never();
        collection.expect_bulk_write().never();

        assert_eq!(run_with(collection).await, Ok(()));
    }

    #[tokio::test]
    async fn test_invalid_base64_is_payload_error() {
        let mut collection = collection_yielding(vec![Ok(attached_report("r1", "q1.pdf", "not base64!"))]);
        collection.expect_upload_external().never();
        collection.expect_bulk_write().never();

        assert!(matches!(
            run_with(collection).await,
            Err(MigrationError::Decode(DecodeError::Payload { ref id, .. })) if id == "r1"
        ));
    }

    #[tokio::test]
    async fn test_malformed_document_is_document_error() {
        let mut collection = collection_yielding(vec![Ok(json!({"id": "r1", "attachment": {"data": "AA=="}}))]);
        collection.expect_upload_external().never();

        assert!(matches!(
            run_with(collection).await,
            Err(MigrationError::Decode(DecodeError::Document(_)))
        ));
    }

    #[tokio::test]
    async fn test_upload_failure_stops_before_write_back() {
        let mut collection = collection_yielding(vec![
            Ok(attached_report("r1", "q1.pdf", "JVBERi0xLjc=")),
            Ok(attached_report("r2", "q2.pdf", "JVBERi0xLjc=")),
        ]);
        collection
            .expect_upload_external()
            .times(1)
            .returning(|_, _, _| Err(StorageError::ObjectStore("access denied".to_string())));
        collection.expect_bulk_write().never();

        assert_eq!(
            run_with(collection).await,
            Err(MigrationError::Write(StorageError::ObjectStore("access denied".to_string())))
        );
    }

    #[tokio::test]
    async fn test_write_back_failure_is_returned() {
        let mut collection = collection_yielding(vec![Ok(attached_report("r1", "q1.pdf", "JVBERi0xLjc="))]);
        collection.expect_upload_external().times(1).returning(|_, _, _| Ok(()));
        collection
            .expect_bulk_write()
            .times(1)
            .returning(|_, _| Err(StorageError::WriteFailed("document failed validation".to_string())));

        assert_eq!(
            run_with(collection).await,
            Err(MigrationError::Write(StorageError::WriteFailed(
                "document failed validation".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_cancelled_upload_reports_cancellation() {
        let mut collection = collection_yielding(vec![Ok(attached_report("r1", "q1.pdf", "JVBERi0xLjc="))]);
        collection
            .expect_upload_external()
            .times(1)
            .returning(|_, _, _| Err(StorageError::Cancelled));
        collection.expect_bulk_write().never();

        assert_eq!(run_with(collection).await, Err(MigrationError::Cancelled));
    }
}
