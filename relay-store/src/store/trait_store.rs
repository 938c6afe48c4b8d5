use async_trait::async_trait;
use uuid::Uuid;

use crate::store::types::*;

/// Persistence for retry lineages.
///
/// One row per retry generation, keyed by `(connection_id, token)`. Rows are
/// written append-then-delete-prior; the payload of a row is never updated.
#[async_trait]
pub trait RetryStore: Send + Sync {
    async fn insert_retry(&self, retry: NewRetry) -> Result<RetryRecord, StoreError>;

    async fn get_retry(
        &self,
        connection_id: &str,
        token: Uuid,
    ) -> Result<Option<RetryRecord>, StoreError>;

    /// Latest non-exhausted row for the connection, if any.
    async fn current_retry(&self, connection_id: &str) -> Result<Option<RetryRecord>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError>;

    async fn mark_exhausted(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError>;

    /// Claim up to `limit` pending rows whose `next_run_at` has passed, moving them
    /// to `running`. Concurrent claimers never receive the same row.
    async fn claim_due_retries(&self, limit: i64) -> Result<Vec<RetryRecord>, StoreError>;

    /// Put a claimed row back to `pending` so a later poll picks it up again.
    async fn release_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError>;

    async fn list_retries(&self, connection_id: Option<&str>) -> Result<Vec<RetryRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("retry payload serialization failed: {0}")]
    Serialization(String),
    #[error("store error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Other(e.to_string())
    }
}
