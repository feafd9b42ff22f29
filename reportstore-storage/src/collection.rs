//! Collection accessor contract

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::{
    blob::ObjectKey,
    context::OperationContext,
    filters::{Filter, FindOptions, UpdateOperation},
    index::IndexSpecification,
    StorageResult,
};

/// Result of a delete-many
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Result of a bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// A database handle that hands out collections by name
pub trait Database: Send + Sync {
    /// Get a handle to the named collection; performs no I/O
    fn collection(&self, name: &str) -> Arc<dyn CollectionHandle>;
}

/// Operations migrations may perform against one collection
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    /// Check whether an index with the same key mapping exists
    async fn index_exists(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<bool>;

    /// Create an index
    async fn create_index(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<()>;

    /// Run a query and return a cursor over the matching raw documents
    async fn find(
        &self,
        ctx: &OperationContext,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn Cursor>>;

    /// Delete every document matching the filter
    async fn delete_many(&self, ctx: &OperationContext, filter: &Filter) -> StorageResult<DeleteResult>;

    /// Submit a batch of per-document updates in one request; an empty batch is a no-op
    async fn bulk_write(
        &self,
        ctx: &OperationContext,
        operations: Vec<UpdateOperation>,
    ) -> StorageResult<BulkWriteResult>;

    /// Store a payload in external object storage under `key`
    async fn upload_external(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<()>;
}

/// Server-side handle over a query's matching documents
///
/// A cursor is single-pass: `advance` moves to the next record and returns
/// `false` once the results are exhausted; `current` returns the raw record
/// at the current position.
#[async_trait]
pub trait Cursor: Send {
    /// Move to the next record, fetching another batch if needed
    async fn advance(&mut self, ctx: &OperationContext) -> StorageResult<bool>;

    /// The record at the current position
    fn current(&self) -> StorageResult<serde_json::Value>;
}
