use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{StoreError, StoreKey, StoredResponse};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Status of a removal.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}

/// Persistent storage for HTTP responses.
///
/// Implementations only persist and return what they are given; freshness
/// decisions belong to the caller (see [`StoredResponse::is_fresh`]).
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads the entry stored under `key`.
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<StoredResponse>>;

    /// Writes `value` under `key`, replacing any previous entry.
    ///
    /// When `ttl` is set the store may drop the entry once it elapses.
    async fn write(
        &self,
        key: &StoreKey,
        value: StoredResponse,
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    /// Removes the entry stored under `key`.
    async fn remove(&self, key: &StoreKey) -> StoreResult<DeleteStatus>;

    /// Name of this store, used in log fields.
    fn label(&self) -> &str {
        "store"
    }
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<StoredResponse>> {
        (**self).read(key).await
    }

    async fn write(
        &self,
        key: &StoreKey,
        value: StoredResponse,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        (**self).write(key, value, ttl).await
    }

    async fn remove(&self, key: &StoreKey) -> StoreResult<DeleteStatus> {
        (**self).remove(key).await
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
