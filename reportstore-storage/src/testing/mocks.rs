//! Mock implementations of the collection accessor traits

use async_trait::async_trait;
use bytes::Bytes;
use mockall::mock;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    blob::ObjectKey,
    collection::{BulkWriteResult, CollectionHandle, Cursor, Database, DeleteResult},
    context::OperationContext,
    filters::{Filter, FindOptions, UpdateOperation},
    index::IndexSpecification,
    StorageError, StorageResult,
};

mock! {
    pub Store {}

    impl Database for Store {
        fn collection(&self, name: &str) -> Arc<dyn CollectionHandle>;
    }
}

mock! {
    pub Collection {}

    #[async_trait]
    impl CollectionHandle for Collection {
        async fn index_exists(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<bool>;
        async fn create_index(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<()>;
        async fn find(&self, ctx: &OperationContext, filter: &Filter, options: &FindOptions) -> StorageResult<Box<dyn Cursor>>;
        async fn delete_many(&self, ctx: &OperationContext, filter: &Filter) -> StorageResult<DeleteResult>;
        async fn bulk_write(&self, ctx: &OperationContext, operations: Vec<UpdateOperation>) -> StorageResult<BulkWriteResult>;
        async fn upload_external(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<()>;
    }
}

mock! {
    pub RecordCursor {}

    #[async_trait]
    impl Cursor for RecordCursor {
        async fn advance(&mut self, ctx: &OperationContext) -> StorageResult<bool>;
        fn current(&self) -> StorageResult<Value>;
    }
}

/// A database whose every collection lookup returns `collection`
pub fn database_with(collection: MockCollection) -> MockStore {
    let collection: Arc<dyn CollectionHandle> = Arc::new(collection);
    let mut database = MockStore::new();
    database
        .expect_collection()
        .returning(move |_| collection.clone());
    database
}

/// A cursor that yields `records` in order, then reports exhaustion
pub fn mock_cursor(records: Vec<StorageResult<Value>>) -> MockRecordCursor {
    scripted_cursor(records, None)
}

/// A cursor that yields `records` in order, then fails to advance with `error`
pub fn failing_cursor(records: Vec<StorageResult<Value>>, error: StorageError) -> MockRecordCursor {
    scripted_cursor(records, Some(error))
}

fn scripted_cursor(records: Vec<StorageResult<Value>>, error: Option<StorageError>) -> MockRecordCursor {
    let records = Arc::new(records);
    // 1-based index of the current record, 0 before the first advance
    let position = Arc::new(AtomicUsize::new(0));
    let mut cursor = MockRecordCursor::new();

    let total = records.len();
    let advance_position = position.clone();
    cursor.expect_advance().returning(move |_| {
        let next = advance_position.load(Ordering::SeqCst) + 1;
        if next <= total {
            advance_position.store(next, Ordering::SeqCst);
            return Ok(true);
        }
        match &error {
            Some(err) => Err(err.clone()),
            None => Ok(false),
        }
    });

    cursor
        .expect_current()
        .returning(move || match position.load(Ordering::SeqCst) {
            0 => Err(StorageError::Other("cursor is not positioned on a record".to_string())),
            n => records[n - 1].clone(),
        });

    cursor
}
