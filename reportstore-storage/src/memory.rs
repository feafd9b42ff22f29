//! In-memory implementation of the collection accessor
//!
//! Collections keep JSON documents in insertion order, which doubles as the
//! natural query order. Cursors work on a snapshot taken when the query
//! runs, so writes issued while iterating do not affect the results.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::{
    blob::{BlobStorage, ObjectKey},
    collection::{BulkWriteResult, CollectionHandle, Cursor, Database, DeleteResult},
    context::OperationContext,
    filters::{lookup, set_path, Filter, FindOptions, SortDirection, UpdateOperation},
    index::IndexSpecification,
    StorageError, StorageResult,
};

/// Database made of in-memory collections sharing one blob store
#[derive(Debug, Clone)]
pub struct InMemoryDatabase {
    collections: Arc<Mutex<HashMap<String, Arc<InMemoryCollection>>>>,
    blob_storage: BlobStorage,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    /// Create a database whose uploads go to an in-memory object store
    pub fn new() -> Self {
        Self::with_blob_storage(BlobStorage::in_memory("reports"))
    }

    pub fn with_blob_storage(blob_storage: BlobStorage) -> Self {
        Self {
            collections: Arc::new(Mutex::new(HashMap::new())),
            blob_storage,
        }
    }

    /// Concrete handle to a collection, created on first use
    pub fn in_memory_collection(&self, name: &str) -> Arc<InMemoryCollection> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryCollection::new(name, self.blob_storage.clone())))
            .clone()
    }

    pub fn blob_storage(&self) -> &BlobStorage {
        &self.blob_storage
    }
}

impl Database for InMemoryDatabase {
    fn collection(&self, name: &str) -> Arc<dyn CollectionHandle> {
        self.in_memory_collection(name)
    }
}

/// A collection of JSON documents
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    documents: RwLock<Vec<Value>>,
    indexes: RwLock<Vec<IndexSpecification>>,
    blob_storage: BlobStorage,
}

impl InMemoryCollection {
    fn new(name: &str, blob_storage: BlobStorage) -> Self {
        Self {
            name: name.to_string(),
            documents: RwLock::new(Vec::new()),
            indexes: RwLock::new(Vec::new()),
            blob_storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append documents as-is; no shape checks are applied
    pub async fn insert_many(&self, documents: impl IntoIterator<Item = Value>) {
        self.documents.write().await.extend(documents);
    }

    /// Serialize and append typed documents
    pub async fn insert_all<T: serde::Serialize>(&self, documents: &[T]) -> StorageResult<()> {
        let values = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.insert_many(values).await;
        Ok(())
    }

    /// Snapshot of every stored document
    pub async fn documents(&self) -> Vec<Value> {
        self.documents.read().await.clone()
    }

    /// Snapshot of the index list
    pub async fn indexes(&self) -> Vec<IndexSpecification> {
        self.indexes.read().await.clone()
    }
}

#[async_trait]
impl CollectionHandle for InMemoryCollection {
    async fn index_exists(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<bool> {
        ctx.check()?;
        let indexes = self.indexes.read().await;
        Ok(indexes.iter().any(|existing| existing.same_keys(spec)))
    }

    async fn create_index(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<()> {
        ctx.check()?;
        let mut indexes = self.indexes.write().await;

        if let Some(existing) = indexes.iter().find(|existing| existing.same_keys(spec)) {
            if existing.name != spec.name || existing.unique != spec.unique {
                return Err(StorageError::WriteFailed(format!(
                    "index {} conflicts with existing index {} on {}",
                    spec.name, existing.name, self.name
                )));
            }
            return Ok(());
        }

        if indexes.iter().any(|existing| existing.name == spec.name) {
            return Err(StorageError::WriteFailed(format!(
                "an index named {} already exists on {}",
                spec.name, self.name
            )));
        }

        log::debug!("creating index {} on {}", spec.name, self.name);
        indexes.push(spec.clone());
        Ok(())
    }

    async fn find(
        &self,
        ctx: &OperationContext,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn Cursor>> {
        ctx.check()?;
        let documents = self.documents.read().await;

        let mut matched: Vec<Value> = documents.iter().filter(|doc| filter.matches(doc)).cloned().collect();

        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| compare_by(a, b, sort));
        }

        if let Some(fields) = &options.projection {
            matched = matched.iter().map(|doc| project(doc, fields)).collect();
        }

        log::debug!("find on {} matched {} documents", self.name, matched.len());
        Ok(Box::new(InMemoryCursor::new(matched)))
    }

    async fn delete_many(&self, ctx: &OperationContext, filter: &Filter) -> StorageResult<DeleteResult> {
        ctx.check()?;
        let mut documents = self.documents.write().await;

        let before = documents.len();
        documents.retain(|doc| !filter.matches(doc));
        let deleted_count = (before - documents.len()) as u64;

        log::debug!("deleted {} documents from {}", deleted_count, self.name);
        Ok(DeleteResult { deleted_count })
    }

    async fn bulk_write(
        &self,
        ctx: &OperationContext,
        operations: Vec<UpdateOperation>,
    ) -> StorageResult<BulkWriteResult> {
        ctx.check()?;
        let mut documents = self.documents.write().await;
        let mut result = BulkWriteResult::default();

        for operation in &operations {
            if let Some(document) = documents.iter_mut().find(|doc| operation.selector.matches(doc)) {
                let before = document.clone();
                operation.apply(document);
                result.matched_count += 1;
                if *document != before {
                    result.modified_count += 1;
                }
            }
        }

        log::debug!(
            "bulk write of {} operations on {}: {} matched, {} modified",
            operations.len(),
            self.name,
            result.matched_count,
            result.modified_count
        );
        Ok(result)
    }

    async fn upload_external(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<()> {
        self.blob_storage.put(ctx, key, payload).await?;
        Ok(())
    }
}

/// Cursor over a materialised result set
#[derive(Debug)]
pub struct InMemoryCursor {
    documents: Vec<Value>,
    /// Index of the current document plus one; zero before the first advance
    position: usize,
}

impl InMemoryCursor {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents, position: 0 }
    }
}

#[async_trait]
impl Cursor for InMemoryCursor {
    async fn advance(&mut self, ctx: &OperationContext) -> StorageResult<bool> {
        ctx.check()?;
        if self.position < self.documents.len() {
            self.position += 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn current(&self) -> StorageResult<Value> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.documents.get(index))
            .cloned()
            .ok_or_else(|| StorageError::Other("cursor is not positioned on a document".to_string()))
    }
}

fn project(document: &Value, fields: &[String]) -> Value {
    let mut projected = Value::Object(Map::new());
    for field in fields {
        if let Some(value) = lookup(document, field) {
            set_path(&mut projected, field, value.clone());
        }
    }
    projected
}

fn compare_by(a: &Value, b: &Value, sort: &[(String, SortDirection)]) -> std::cmp::Ordering {
    sort.iter()
        .map(|(field, direction)| {
            let ordering = compare_values(lookup(a, field), lookup(b, field));
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
