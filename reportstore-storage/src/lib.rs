//! Storage abstraction for report documents
//!
//! This crate defines the narrow capability surface migrations are written
//! against: a [`Database`] hands out [`CollectionHandle`]s, which support
//! index inspection and creation, filtered finds through a pull-based
//! [`Cursor`], bulk writes, delete-many and uploads to external object
//! storage. Two adapters implement it: [`InMemoryDatabase`] and, behind the
//! `mongodb` feature, [`MongoDatabase`]. The `testing` feature adds mockall
//! doubles of the same traits.

pub mod blob;
pub mod collection;
pub mod context;
pub mod document;
pub mod error;
pub mod filters;
pub mod index;
pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(feature = "testing")]
pub mod testing;

// Re-export core types for convenience
pub use blob::{BlobStorage, ObjectKey};
pub use collection::{BulkWriteResult, CollectionHandle, Cursor, Database, DeleteResult};
pub use context::OperationContext;
pub use document::{Attachment, ReportDocument};
pub use error::{StorageError, StorageResult};
pub use filters::{Filter, FindOptions, SortDirection, UpdateOperation};
pub use index::IndexSpecification;
pub use memory::{InMemoryCollection, InMemoryDatabase};

#[cfg(feature = "mongodb")]
pub use mongo::MongoDatabase;
