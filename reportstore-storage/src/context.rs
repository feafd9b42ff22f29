//! Caller-supplied context passed to every storage call

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::{StorageError, StorageResult};

/// Carries the caller's cancellation signal into every I/O call
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancellation: CancellationToken,
}

impl OperationContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, typically a child of the runner's shutdown token
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail fast if the context has already been cancelled
    pub fn check(&self) -> StorageResult<()> {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        Ok(())
    }

    /// Run an I/O future, aborting it with [`StorageError::Cancelled`] on cancellation
    pub async fn guard<F, T>(&self, operation: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(StorageError::Cancelled),
            result = operation => result,
        }
    }
}
