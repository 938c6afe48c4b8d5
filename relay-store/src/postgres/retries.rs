use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{NewRetry, RetryRecord, StoreError};

pub async fn insert_retry(pool: &PgPool, retry: NewRetry) -> Result<RetryRecord, StoreError> {
    let row = sqlx::query_as::<_, RetryRecord>(
        r#"
INSERT INTO retries (connection_id, token, run_name, retry_num, destination_type,
                     destination_config, data, status, next_run_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
RETURNING id, connection_id, token, run_name, retry_num, destination_type,
          destination_config, data, status, next_run_at, created_at, claimed_at
        "#,
    )
    .bind(&retry.connection_id)
    .bind(retry.token)
    .bind(&retry.run_name)
    .bind(retry.retry_num)
    .bind(&retry.destination_type)
    .bind(&retry.destination_config)
    .bind(&retry.data)
    .bind(retry.next_run_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_retry(
    pool: &PgPool,
    connection_id: &str,
    token: Uuid,
) -> Result<Option<RetryRecord>, StoreError> {
    let row = sqlx::query_as::<_, RetryRecord>(
        r#"
SELECT id, connection_id, token, run_name, retry_num, destination_type,
       destination_config, data, status, next_run_at, created_at, claimed_at
FROM retries WHERE connection_id = $1 AND token = $2
        "#,
    )
    .bind(connection_id)
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn current_retry(pool: &PgPool, connection_id: &str) -> Result<Option<RetryRecord>, StoreError> {
    let row = sqlx::query_as::<_, RetryRecord>(
        r#"
SELECT id, connection_id, token, run_name, retry_num, destination_type,
       destination_config, data, status, next_run_at, created_at, claimed_at
FROM retries WHERE connection_id = $1 AND status <> 'exhausted'
ORDER BY id DESC
LIMIT 1
        "#,
    )
    .bind(connection_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_retry(pool: &PgPool, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(r#"DELETE FROM retries WHERE connection_id = $1 AND token = $2"#)
        .bind(connection_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_exhausted(pool: &PgPool, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"UPDATE retries SET status = 'exhausted' WHERE connection_id = $1 AND token = $2"#,
    )
    .bind(connection_id)
    .bind(token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn claim_due_retries(pool: &PgPool, limit: i64) -> Result<Vec<RetryRecord>, StoreError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query_as::<_, RetryRecord>(
        r#"
WITH picked AS (
  SELECT id FROM retries
  WHERE status = 'pending' AND next_run_at <= now()
  ORDER BY next_run_at, id
  FOR UPDATE SKIP LOCKED
  LIMIT $1
)
UPDATE retries r
SET status = 'running', claimed_at = now()
FROM picked WHERE r.id = picked.id
RETURNING r.id, r.connection_id, r.token, r.run_name, r.retry_num, r.destination_type,
          r.destination_config, r.data, r.status, r.next_run_at, r.created_at, r.claimed_at
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    let mut rows = rows;
    rows.sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at).then(a.id.cmp(&b.id)));
    Ok(rows)
}

pub async fn release_retry(pool: &PgPool, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
UPDATE retries SET status = 'pending', claimed_at = NULL
WHERE connection_id = $1 AND token = $2 AND status = 'running'
        "#,
    )
    .bind(connection_id)
    .bind(token)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_retries(pool: &PgPool, connection_id: Option<&str>) -> Result<Vec<RetryRecord>, StoreError> {
    let rows = sqlx::query_as::<_, RetryRecord>(
        r#"
SELECT id, connection_id, token, run_name, retry_num, destination_type,
       destination_config, data, status, next_run_at, created_at, claimed_at
FROM retries
WHERE ($1::text IS NULL OR connection_id = $1)
ORDER BY connection_id, id
        "#,
    )
    .bind(connection_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
