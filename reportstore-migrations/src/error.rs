//! Migration error types

use reportstore_storage::StorageError;
use thiserror::Error;

/// Result type for migration operations
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

/// A fetched record or one of its fields could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record could not be read or did not have the expected shape
    #[error("invalid report document: {0}")]
    Document(StorageError),

    /// The embedded attachment payload is not valid base64
    #[error("invalid attachment payload for report {id}: {reason}")]
    Payload { id: String, reason: String },
}

/// Why a migration stopped
///
/// Migrations stop at the first failure; the wrapped storage error is the
/// one reported by the collection accessor, unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A find, index check or cursor fetch failed
    #[error("query failed: {0}")]
    Query(StorageError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// An index creation, delete, bulk write or upload failed
    #[error("write failed: {0}")]
    Write(StorageError),

    #[error("migration cancelled")]
    Cancelled,
}

impl MigrationError {
    /// Classify a failed read
    pub fn query(err: StorageError) -> Self {
        match err {
            StorageError::Cancelled => MigrationError::Cancelled,
            err => MigrationError::Query(err),
        }
    }

    /// Classify a failed write
    pub fn write(err: StorageError) -> Self {
        match err {
            StorageError::Cancelled => MigrationError::Cancelled,
            err => MigrationError::Write(err),
        }
    }

    /// Classify a record that could not be read or parsed
    pub fn document(err: StorageError) -> Self {
        match err {
            StorageError::Cancelled => MigrationError::Cancelled,
            err => MigrationError::Decode(DecodeError::Document(err)),
        }
    }

    /// Get error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            MigrationError::Query(_) => "QUERY_ERROR",
            MigrationError::Decode(_) => "DECODE_ERROR",
            MigrationError::Write(_) => "WRITE_ERROR",
            MigrationError::Cancelled => "CANCELLED",
        }
    }

    /// The storage error behind this failure, if any
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            MigrationError::Query(err) | MigrationError::Write(err) => Some(err),
            MigrationError::Decode(DecodeError::Document(err)) => Some(err),
            MigrationError::Decode(DecodeError::Payload { .. }) | MigrationError::Cancelled => None,
        }
    }
}
