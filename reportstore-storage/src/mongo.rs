//! MongoDB implementation of the collection accessor

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use bytes::Bytes;
use futures::TryStreamExt;
use mongodb::{
    error::{Error as MongoError, ErrorKind},
    options::{ClientOptions, FindOptions as MongoFindOptions, IndexOptions},
    Client, IndexModel,
};
use reportstore_config::DatabaseConfig;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    blob::{BlobStorage, ObjectKey},
    collection::{BulkWriteResult, CollectionHandle, Cursor, Database, DeleteResult},
    context::OperationContext,
    filters::{Filter, FindOptions, SortDirection, UpdateOperation},
    index::IndexSpecification,
    StorageError, StorageResult,
};

/// Server error code returned when listing indexes of a missing collection
const NAMESPACE_NOT_FOUND: i32 = 26;

/// Server limit on statements per write command (`maxWriteBatchSize`)
const MAX_WRITE_BATCH_SIZE: usize = 100_000;

/// Budget for the statements of one command, below the 16 MiB document
/// limit to leave room for the command envelope
const MAX_BATCH_BYTES: usize = 16 * 1024 * 1024 - 64 * 1024;

/// Database handle backed by the MongoDB driver
#[derive(Debug, Clone)]
pub struct MongoDatabase {
    database: mongodb::Database,
    blob_storage: BlobStorage,
}

impl MongoDatabase {
    /// Connect using the database configuration
    pub async fn connect(config: &DatabaseConfig, blob_storage: BlobStorage) -> StorageResult<Self> {
        let mut options = ClientOptions::parse(&config.url).await.map_err(connection_error)?;
        options.app_name = Some("reportstore-migrations".to_string());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        let client = Client::with_options(options).map_err(connection_error)?;
        log::info!("connected to database {}", config.name);
        Ok(Self::new(client.database(&config.name), blob_storage))
    }

    pub fn new(database: mongodb::Database, blob_storage: BlobStorage) -> Self {
        Self { database, blob_storage }
    }
}

impl Database for MongoDatabase {
    fn collection(&self, name: &str) -> Arc<dyn CollectionHandle> {
        Arc::new(MongoCollection {
            database: self.database.clone(),
            collection: self.database.collection::<Document>(name),
            blob_storage: self.blob_storage.clone(),
        })
    }
}

/// One MongoDB collection plus the blob store used for uploads
#[derive(Debug, Clone)]
pub struct MongoCollection {
    database: mongodb::Database,
    collection: mongodb::Collection<Document>,
    blob_storage: BlobStorage,
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    async fn index_exists(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<bool> {
        ctx.guard(async {
            let mut indexes = match self.collection.list_indexes(None).await {
                Ok(cursor) => cursor,
                Err(err) if is_namespace_not_found(&err) => return Ok(false),
                Err(err) => return Err(query_error(err)),
            };

            while let Some(model) = indexes.try_next().await.map_err(query_error)? {
                if keys_match(&model.keys, spec) {
                    return Ok(true);
                }
            }
            Ok(false)
        })
        .await
    }

    async fn create_index(&self, ctx: &OperationContext, spec: &IndexSpecification) -> StorageResult<()> {
        let options = IndexOptions::builder()
            .name(spec.name.clone())
            .unique(spec.unique)
            .build();
        let model = IndexModel::builder()
            .keys(key_document(&spec.keys))
            .options(options)
            .build();

        ctx.guard(async {
            self.collection.create_index(model, None).await.map_err(write_error)?;
            log::info!("created index {} on {}", spec.name, self.collection.name());
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        ctx: &OperationContext,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn Cursor>> {
        let filter = filter_document(filter)?;
        let mut find_options = MongoFindOptions::default();
        find_options.projection = options.projection.as_ref().map(|fields| projection_document(fields));
        find_options.sort = options.sort.as_ref().map(|keys| key_document(keys));
        find_options.batch_size = options.batch_size;

        let cursor = ctx
            .guard(async { self.collection.find(filter, find_options).await.map_err(query_error) })
            .await?;
        Ok(Box::new(MongoCursor { cursor }))
    }

    async fn delete_many(&self, ctx: &OperationContext, filter: &Filter) -> StorageResult<DeleteResult> {
        let filter = filter_document(filter)?;
        let result = ctx
            .guard(async { self.collection.delete_many(filter, None).await.map_err(write_error) })
            .await?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn bulk_write(
        &self,
        ctx: &OperationContext,
        operations: Vec<UpdateOperation>,
    ) -> StorageResult<BulkWriteResult> {
        ctx.check()?;
        // The update command rejects an empty statement list
        if operations.is_empty() {
            return Ok(BulkWriteResult::default());
        }

        let updates = operations
            .iter()
            .map(update_statement)
            .collect::<StorageResult<Vec<Document>>>()?;
        let batches = split_batches(updates, MAX_WRITE_BATCH_SIZE, MAX_BATCH_BYTES)?;
        let batch_count = batches.len();

        // Batches run in order; one that fails stops the rest
        let mut total = BulkWriteResult::default();
        for (index, batch) in batches.into_iter().enumerate() {
            let command = doc! {
                "update": self.collection.name(),
                "updates": batch,
                "ordered": true,
            };
            let reply = ctx
                .guard(async { self.database.run_command(command, None).await.map_err(write_error) })
                .await?;

            let result = write_reply(&reply)?;
            total.matched_count += result.matched_count;
            total.modified_count += result.modified_count;
            log::debug!(
                "update batch {}/{} on {}: {} matched, {} modified",
                index + 1,
                batch_count,
                self.collection.name(),
                result.matched_count,
                result.modified_count
            );
        }

        Ok(total)
    }

    async fn upload_external(&self, ctx: &OperationContext, key: &ObjectKey, payload: Bytes) -> StorageResult<()> {
        self.blob_storage.put(ctx, key, payload).await?;
        Ok(())
    }
}

/// Cursor over a MongoDB query
pub struct MongoCursor {
    cursor: mongodb::Cursor<Document>,
}

#[async_trait]
impl Cursor for MongoCursor {
    async fn advance(&mut self, ctx: &OperationContext) -> StorageResult<bool> {
        ctx.guard(async { self.cursor.advance().await.map_err(query_error) })
            .await
    }

    fn current(&self) -> StorageResult<Value> {
        let document: Document = self
            .cursor
            .deserialize_current()
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Bson::Document(document).into_relaxed_extjson())
    }
}

/// Translate a typed filter into a query document
fn filter_document(filter: &Filter) -> StorageResult<Document> {
    let mut document = Document::new();
    match filter {
        Filter::All => {}
        Filter::Eq(field, value) => {
            document.insert(field.clone(), json_to_bson(value)?);
        }
        Filter::Exists(field, exists) => {
            document.insert(field.clone(), doc! { "$exists": *exists });
        }
        Filter::IsString(field) => {
            document.insert(field.clone(), doc! { "$type": "string" });
        }
        Filter::In(field, values) => {
            let values = values.iter().map(json_to_bson).collect::<StorageResult<Vec<Bson>>>()?;
            document.insert(field.clone(), doc! { "$in": values });
        }
        Filter::And(filters) => {
            let clauses = filters.iter().map(filter_document).collect::<StorageResult<Vec<Document>>>()?;
            document.insert("$and", clauses);
        }
    }
    Ok(document)
}

/// One statement of the `update` command
fn update_statement(operation: &UpdateOperation) -> StorageResult<Document> {
    let mut update = Document::new();

    if !operation.set.is_empty() {
        let mut set = Document::new();
        for (field, value) in &operation.set {
            set.insert(field.clone(), json_to_bson(value)?);
        }
        update.insert("$set", set);
    }

    if !operation.unset.is_empty() {
        let mut unset = Document::new();
        for field in &operation.unset {
            unset.insert(field.clone(), "");
        }
        update.insert("$unset", unset);
    }

    // An empty update document would replace the whole record
    if update.is_empty() {
        return Err(StorageError::WriteFailed("update operation has no changes".to_string()));
    }

    Ok(doc! {
        "q": filter_document(&operation.selector)?,
        "u": update,
        "multi": false,
        "upsert": false,
    })
}

/// Group update statements into command-sized batches, preserving order
fn split_batches(statements: Vec<Document>, max_count: usize, max_bytes: usize) -> StorageResult<Vec<Vec<Document>>> {
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut current_bytes = 0;

    for statement in statements {
        let size = bson::to_vec(&statement)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?
            .len();
        if size > max_bytes {
            return Err(StorageError::WriteFailed(format!(
                "update statement of {} bytes exceeds the {} byte command limit",
                size, max_bytes
            )));
        }

        if !current.is_empty() && (current.len() == max_count || current_bytes + size > max_bytes) {
            batches.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += size;
        current.push(statement);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

/// Read the counts of an `update` reply, failing on write or write concern errors
fn write_reply(reply: &Document) -> StorageResult<BulkWriteResult> {
    if let Ok(errors) = reply.get_array("writeErrors") {
        if let Some(first) = errors.first() {
            return Err(StorageError::WriteFailed(format!(
                "{} updates failed, first: {}",
                errors.len(),
                first
            )));
        }
    }

    if let Ok(concern) = reply.get_document("writeConcernError") {
        let message = concern.get_str("errmsg").unwrap_or("unknown write concern error");
        return Err(StorageError::WriteFailed(format!("write concern error: {}", message)));
    }

    Ok(BulkWriteResult {
        matched_count: count_field(reply, "n"),
        modified_count: count_field(reply, "nModified"),
    })
}

fn key_document(keys: &[(String, SortDirection)]) -> Document {
    let mut document = Document::new();
    for (field, direction) in keys {
        document.insert(field.clone(), direction.as_i32());
    }
    document
}

fn projection_document(fields: &[String]) -> Document {
    let mut document = Document::new();
    for field in fields {
        document.insert(field.clone(), 1);
    }
    document
}

/// Compare a listed index key document with a specification, order included
fn keys_match(keys: &Document, spec: &IndexSpecification) -> bool {
    keys.len() == spec.keys.len()
        && keys
            .iter()
            .zip(&spec.keys)
            .all(|((field, value), (expected_field, direction))| {
                field == expected_field && numeric(value) == Some(f64::from(direction.as_i32()))
            })
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn count_field(reply: &Document, field: &str) -> u64 {
    match reply.get(field) {
        Some(Bson::Int32(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Int64(v)) => u64::try_from(*v).unwrap_or(0),
        _ => 0,
    }
}

fn json_to_bson(value: &Value) -> StorageResult<Bson> {
    bson::to_bson(value).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn is_namespace_not_found(err: &MongoError) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(command) if command.code == NAMESPACE_NOT_FOUND)
}

fn connection_error(err: MongoError) -> StorageError {
    StorageError::ConnectionFailed(err.to_string())
}

fn query_error(err: MongoError) -> StorageError {
    StorageError::QueryFailed(err.to_string())
}

fn write_error(err: MongoError) -> StorageError {
    StorageError::WriteFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_translation() {
        assert_eq!(filter_document(&Filter::All).unwrap(), Document::new());
        assert_eq!(
            filter_document(&Filter::eq("deleted", true)).unwrap(),
            doc! { "deleted": true }
        );
        assert_eq!(
            filter_document(&Filter::missing("metadata.retention_policy")).unwrap(),
            doc! { "metadata.retention_policy": { "$exists": false } }
        );
        assert_eq!(
            filter_document(&Filter::is_string("attachment.data")).unwrap(),
            doc! { "attachment.data": { "$type": "string" } }
        );
        assert_eq!(
            filter_document(&Filter::in_values("id", ["r1"])).unwrap(),
            doc! { "id": { "$in": ["r1"] } }
        );
        assert_eq!(
            filter_document(&Filter::and(vec![Filter::exists("attachment.data"), Filter::eq("name", "q1")])).unwrap(),
            doc! { "$and": [ { "attachment.data": { "$exists": true } }, { "name": "q1" } ] }
        );
    }

    #[test]
    fn test_update_statement() {
        let operation = UpdateOperation::for_id("r1")
            .set("attachment.external_key", "reports/r1/a.pdf")
            .unset("attachment.data");

        assert_eq!(
            update_statement(&operation).unwrap(),
            doc! {
                "q": { "id": "r1" },
                "u": {
                    "$set": { "attachment.external_key": "reports/r1/a.pdf" },
                    "$unset": { "attachment.data": "" },
                },
                "multi": false,
                "upsert": false,
            }
        );
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let operation = UpdateOperation::for_id("r1");
        assert!(matches!(update_statement(&operation), Err(StorageError::WriteFailed(_))));
    }

    #[test]
    fn test_keys_match_accepts_numeric_variants() {
        let spec = IndexSpecification::new("report_name").ascending("name").descending("id");
        assert!(keys_match(&doc! { "name": 1, "id": -1 }, &spec));
        assert!(keys_match(&doc! { "name": 1.0, "id": -1_i64 }, &spec));
        assert!(!keys_match(&doc! { "id": -1, "name": 1 }, &spec));
        assert!(!keys_match(&doc! { "name": 1 }, &spec));
        assert!(!keys_match(&doc! { "name": "text", "id": -1 }, &spec));
    }

    fn statements(count: usize) -> Vec<Document> {
        (0..count)
            .map(|i| update_statement(&UpdateOperation::for_id(format!("r{}", i)).set("metadata.owner", "ops")).unwrap())
            .collect()
    }

    #[test]
    fn test_split_batches_by_count() {
        let batches = split_batches(statements(5), 2, MAX_BATCH_BYTES).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[2][0].get_document("q").unwrap(), &doc! { "id": "r4" });
    }

    #[test]
    fn test_split_batches_by_size() {
        let all = statements(4);
        let one = bson::to_vec(&all[0]).unwrap().len();
        let batches = split_batches(all, MAX_WRITE_BATCH_SIZE, one * 2 + 1).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn test_split_batches_rejects_oversized_statement() {
        let result = split_batches(statements(1), MAX_WRITE_BATCH_SIZE, 8);
        assert!(matches!(result, Err(StorageError::WriteFailed(_))));
    }

    #[test]
    fn test_large_backfill_stays_under_server_batch_limit() {
        let batches = split_batches(statements(150_000), MAX_WRITE_BATCH_SIZE, MAX_BATCH_BYTES).unwrap();
        assert!(batches.len() >= 2);
        assert!(batches.iter().all(|batch| batch.len() <= MAX_WRITE_BATCH_SIZE));
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 150_000);
    }

    #[test]
    fn test_write_reply() {
        assert_eq!(
            write_reply(&doc! { "n": 2, "nModified": 1, "ok": 1.0 }).unwrap(),
            BulkWriteResult { matched_count: 2, modified_count: 1 }
        );
        assert!(matches!(
            write_reply(&doc! { "n": 1, "ok": 1.0, "writeErrors": [ { "index": 1, "code": 11000, "errmsg": "dup" } ] }),
            Err(StorageError::WriteFailed(_))
        ));
        let concern = write_reply(&doc! {
            "n": 2, "nModified": 2, "ok": 1.0,
            "writeConcernError": { "code": 64, "errmsg": "waiting for replication timed out" },
        });
        assert_eq!(
            concern,
            Err(StorageError::WriteFailed(
                "write concern error: waiting for replication timed out".to_string()
            ))
        );
    }

    #[test]
    fn test_count_field() {
        let reply = doc! { "n": 3, "nModified": 2_i64, "ok": 1.0 };
        assert_eq!(count_field(&reply, "n"), 3);
        assert_eq!(count_field(&reply, "nModified"), 2);
        assert_eq!(count_field(&reply, "missing"), 0);
    }

    #[test]
    fn test_json_values_convert() {
        assert_eq!(json_to_bson(&json!("standard")).unwrap(), Bson::String("standard".to_string()));
        assert_eq!(json_to_bson(&json!(true)).unwrap(), Bson::Boolean(true));
    }
}
