//! Storage error types

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-related errors
///
/// Every variant carries a rendered message so errors can be cloned and
/// compared; adapters convert driver errors at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Connection-related errors
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution errors (find, index listing, cursor fetch)
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Write errors (index creation, delete, bulk write)
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// External object storage errors
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller's context was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic storage errors
    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::ConnectionFailed(_) | StorageError::ObjectStore(_))
    }

    /// Get error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::ConnectionFailed(_) => "CONNECTION_ERROR",
            StorageError::QueryFailed(_) => "QUERY_ERROR",
            StorageError::WriteFailed(_) => "WRITE_ERROR",
            StorageError::SerializationError(_) => "SERIALIZATION_ERROR",
            StorageError::ObjectStore(_) => "OBJECT_STORE_ERROR",
            StorageError::Configuration(_) => "CONFIG_ERROR",
            StorageError::Cancelled => "CANCELLED",
            StorageError::Other(_) => "STORAGE_ERROR",
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        StorageError::ObjectStore(err.to_string())
    }
}
