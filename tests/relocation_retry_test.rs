//! Relocation resumes where a failed run stopped

use async_trait::async_trait;
use bytes::Bytes;
use reportstore_migrations::{Migration, MigrationError, MigrationSettings, RelocateAttachments};
use reportstore_storage::testing::attached_report;
use reportstore_storage::{
    BulkWriteResult, CollectionHandle, Cursor, Database, DeleteResult, Filter, FindOptions, InMemoryCollection,
    InMemoryDatabase, IndexSpecification, ObjectKey, OperationContext, StorageError, StorageResult, UpdateOperation,
};
use serde_json::json;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// In-memory store whose uploads can be made to fail for one key
struct FlakyUploads {
    inner: InMemoryDatabase,
    failing_key: Arc<Mutex<Option<String>>>,
    uploads: Arc<Mutex<Vec<String>>>,
}

impl FlakyUploads {
    fn new(inner: InMemoryDatabase) -> Self {
        Self {
            inner,
            failing_key: Arc::new(Mutex::new(None)),
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn fail_uploads_of(&self, key: Option<&str>) {
        *self.failing_key.lock().unwrap() = key.map(str::to_string);
    }

    fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Database for FlakyUploads {
    fn collection(&self, name: &str) -> Arc<dyn CollectionHandle> {
        Arc::new(FlakyCollection {
            inner: self.inner.in_memory_collection(name),
            failing_key: self.failing_key.clone(),
            uploads: self.uploads.clone(),
        })
    }
}

struct FlakyCollection {
    inner: Arc<InMemoryCollection>,
    failing_key: Arc<Mutex<Option<String>>>,
    uploads: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl CollectionHandle for FlakyCollection {
    async fn index_exists(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<bool> {
        self.inner.index_exists(ctx, spec).await
    }

    async fn create_index(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<()> {
        self.inner.create_index(ctx, spec).await
    }

    async fn find(
        &self,
        ctx: &OperationContext,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn Cursor>> {
        self.inner.find(ctx, filter, options).await
    }

    async fn delete_many(&self, ctx: &OperationContext, filter: &Filter) -> StorageResult<DeleteResult> {
        self.inner.delete_many(ctx, filter).await
    }

    async fn bulk_write(
        &self,
        ctx: &OperationContext,
        operations: Vec<UpdateOperation>,
    ) -> StorageResult<BulkWriteResult> {
        self.inner.bulk_write(ctx, operations).await
    }

    async fn upload_external(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<()> {
        let rendered = key.to_string();
        self.uploads.lock().unwrap().push(rendered.clone());
        let failing = self.failing_key.lock().unwrap().clone();
        if failing.as_deref() == Some(rendered.as_str()) {
            return Err(StorageError::ObjectStore(format!("upload of {} rejected", key)));
        }
        self.inner.upload_external(ctx, key, payload).await
    }
}

#[tokio::test]
async fn test_retry_after_upload_failure_skips_relocated_reports() {
    let inner = InMemoryDatabase::new();
    let reports = inner.in_memory_collection("reports");
    reports
        .insert_many(vec![
            attached_report("a", "a.bin", "AAEC"),
            attached_report("b", "b.bin", "AAEC"),
            attached_report("c", "c.bin", "AAEC"),
        ])
        .await;
    let db = FlakyUploads::new(inner);
    let ctx = OperationContext::new();
    let migration = RelocateAttachments::new(&MigrationSettings::default());

    db.fail_uploads_of(Some("b/b.bin"));
    let err = migration.run(&ctx, &db).await.unwrap_err();
    assert_eq!(
        err,
        MigrationError::Write(StorageError::ObjectStore("upload of b/b.bin rejected".to_string()))
    );
    assert_eq!(db.uploads(), vec!["a/a.bin", "b/b.bin"]);

    db.fail_uploads_of(None);
    migration.run(&ctx, &db).await.unwrap();
    assert_eq!(db.uploads(), vec!["a/a.bin", "b/b.bin", "b/b.bin", "c/c.bin"]);

    let documents = reports.documents().await;
    assert!(documents.iter().all(|doc| doc["attachment"].get("data").is_none()));
    assert_eq!(documents[1]["attachment"]["external_key"], json!("b/b.bin"));
}

#[tokio::test]
async fn test_cancellation_mid_run_keeps_completed_reports() {
    let inner = InMemoryDatabase::new();
    let reports = inner.in_memory_collection("reports");
    reports
        .insert_many(vec![attached_report("a", "a.bin", "AAEC"), attached_report("b", "b.bin", "AAEC")])
        .await;

    let cancelled_after_first = Arc::new(AtomicBool::new(false));
    let db = CancelAfterFirstWrite {
        inner,
        ctx: OperationContext::new(),
        fired: cancelled_after_first.clone(),
    };

    let result = RelocateAttachments::new(&MigrationSettings::default())
        .run(&db.ctx, &db)
        .await;
    assert_eq!(result, Err(MigrationError::Cancelled));
    assert!(cancelled_after_first.load(Ordering::SeqCst));

    let documents = reports.documents().await;
    assert_eq!(documents[0]["attachment"]["external_key"], json!("a/a.bin"));
    assert_eq!(documents[1]["attachment"]["data"], json!("AAEC"));
}

/// Cancels the shared context once the first write-back has gone through
struct CancelAfterFirstWrite {
    inner: InMemoryDatabase,
    ctx: OperationContext,
    fired: Arc<AtomicBool>,
}

impl Database for CancelAfterFirstWrite {
    fn collection(&self, name: &str) -> Arc<dyn CollectionHandle> {
        Arc::new(CancellingCollection {
            inner: self.inner.in_memory_collection(name),
            ctx: self.ctx.clone(),
            fired: self.fired.clone(),
        })
    }
}

struct CancellingCollection {
    inner: Arc<InMemoryCollection>,
    ctx: OperationContext,
    fired: Arc<AtomicBool>,
}

#[async_trait]
impl CollectionHandle for CancellingCollection {
    async fn index_exists(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<bool> {
        self.inner.index_exists(ctx, spec).await
    }

    async fn create_index(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<()> {
        self.inner.create_index(ctx, spec).await
    }

    async fn find(
        &self,
        ctx: &OperationContext,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn Cursor>> {
        self.inner.find(ctx, filter, options).await
    }

    async fn delete_many(&self, ctx: &OperationContext, filter: &Filter) -> StorageResult<DeleteResult> {
        self.inner.delete_many(ctx, filter).await
    }

    async fn bulk_write(
        &self,
        ctx: &OperationContext,
        operations: Vec<UpdateOperation>,
    ) -> StorageResult<BulkWriteResult> {
        let result = self.inner.bulk_write(ctx, operations).await?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.ctx.cancel();
        }
        Ok(result)
    }

    async fn upload_external(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<()> {
        self.inner.upload_external(ctx, key, payload).await
    }
}
