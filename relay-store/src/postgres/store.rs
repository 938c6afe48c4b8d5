use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{NewRetry, RetryRecord, RetryStore, StoreError};

use super::retries;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl RetryStore for PostgresStore {
    async fn insert_retry(&self, retry: NewRetry) -> Result<RetryRecord, StoreError> {
        retries::insert_retry(&self.pool, retry).await
    }

    async fn get_retry(&self, connection_id: &str, token: Uuid) -> Result<Option<RetryRecord>, StoreError> {
        retries::get_retry(&self.pool, connection_id, token).await
    }

    async fn current_retry(&self, connection_id: &str) -> Result<Option<RetryRecord>, StoreError> {
        retries::current_retry(&self.pool, connection_id).await
    }

    async fn delete_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        retries::delete_retry(&self.pool, connection_id, token).await
    }

    async fn mark_exhausted(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        retries::mark_exhausted(&self.pool, connection_id, token).await
    }

    async fn claim_due_retries(&self, limit: i64) -> Result<Vec<RetryRecord>, StoreError> {
        retries::claim_due_retries(&self.pool, limit).await
    }

    async fn release_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        retries::release_retry(&self.pool, connection_id, token).await
    }

    async fn list_retries(&self, connection_id: Option<&str>) -> Result<Vec<RetryRecord>, StoreError> {
        retries::list_retries(&self.pool, connection_id).await
    }
}
