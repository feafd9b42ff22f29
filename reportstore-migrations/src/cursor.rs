//! Typed, pull-based iteration over a query's results

use reportstore_storage::{CollectionHandle, Cursor, Filter, FindOptions, OperationContext, StorageError};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::error::{MigrationError, MigrationResult};

/// Single-pass cursor decoding each record into `T`
///
/// Once [`advance`](Self::advance) has returned `false` the cursor is
/// exhausted: later calls return `false` without touching the underlying
/// cursor again.
pub struct DocumentCursor<T> {
    cursor: Box<dyn Cursor>,
    exhausted: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> DocumentCursor<T> {
    /// Run the query and wrap the resulting cursor
    pub async fn open(
        ctx: &OperationContext,
        collection: &dyn CollectionHandle,
        filter: &Filter,
        options: &FindOptions,
    ) -> MigrationResult<Self> {
        let cursor = collection
            .find(ctx, filter, options)
            .await
            .map_err(MigrationError::query)?;
        Ok(Self::new(cursor))
    }

    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        Self {
            cursor,
            exhausted: false,
            _record: PhantomData,
        }
    }

    /// Move to the next record; `false` once the results are exhausted
    pub async fn advance(&mut self, ctx: &OperationContext) -> MigrationResult<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let more = self.cursor.advance(ctx).await.map_err(MigrationError::query)?;
        if !more {
            self.exhausted = true;
        }
        Ok(more)
    }

    /// Decode the record at the current position
    pub fn decode_current(&self) -> MigrationResult<T> {
        let raw = self.cursor.current().map_err(MigrationError::document)?;
        serde_json::from_value(raw).map_err(|e| MigrationError::document(StorageError::from(e)))
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
