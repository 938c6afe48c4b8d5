use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{NewRetry, RetryRecord, RetryStatus, RetryStore, StoreError};

/// In-process [`RetryStore`] with the same row semantics as [`crate::PostgresStore`].
///
/// Used for dry runs, local runs without a database, and tests. Contents are lost
/// when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<RetryRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn find<'a>(rows: &'a mut [RetryRecord], connection_id: &str, token: Uuid) -> Option<&'a mut RetryRecord> {
    rows.iter_mut()
        .find(|r| r.connection_id == connection_id && r.token == token)
}

#[async_trait]
impl RetryStore for MemoryStore {
    async fn insert_retry(&self, retry: NewRetry) -> Result<RetryRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.rows.iter().any(|r| r.token == retry.token) {
            return Err(StoreError::Other(format!(
                "duplicate retry token {}",
                retry.token
            )));
        }
        inner.next_id += 1;
        let row = RetryRecord {
            id: inner.next_id,
            connection_id: retry.connection_id,
            token: retry.token,
            run_name: retry.run_name,
            retry_num: retry.retry_num,
            destination_type: retry.destination_type,
            destination_config: retry.destination_config,
            data: retry.data,
            status: RetryStatus::Pending.as_str().to_string(),
            next_run_at: retry.next_run_at,
            created_at: Utc::now(),
            claimed_at: None,
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn get_retry(&self, connection_id: &str, token: Uuid) -> Result<Option<RetryRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .find(|r| r.connection_id == connection_id && r.token == token)
            .cloned())
    }

    async fn current_retry(&self, connection_id: &str) -> Result<Option<RetryRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.connection_id == connection_id)
            .filter(|r| r.status != RetryStatus::Exhausted.as_str())
            .max_by_key(|r| r.id)
            .cloned())
    }

    async fn delete_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner
            .rows
            .retain(|r| !(r.connection_id == connection_id && r.token == token));
        Ok(inner.rows.len() != before)
    }

    async fn mark_exhausted(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match find(&mut inner.rows, connection_id, token) {
            Some(row) => {
                row.status = RetryStatus::Exhausted.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_due_retries(&self, limit: i64) -> Result<Vec<RetryRecord>, StoreError> {
        let now = Utc::now();
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let mut inner = self.inner.lock().await;

        let mut due: Vec<usize> = inner
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == RetryStatus::Pending.as_str() && r.next_run_at <= now)
            .map(|(i, _)| i)
            .collect();
        due.sort_by(|&a, &b| {
            let (ra, rb) = (&inner.rows[a], &inner.rows[b]);
            ra.next_run_at.cmp(&rb.next_run_at).then(ra.id.cmp(&rb.id))
        });
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for i in due {
            let row = &mut inner.rows[i];
            row.status = RetryStatus::Running.as_str().to_string();
            row.claimed_at = Some(now);
            claimed.push(row.clone());
        }
        Ok(claimed)
    }

    async fn release_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match find(&mut inner.rows, connection_id, token) {
            Some(row) if row.status == RetryStatus::Running.as_str() => {
                row.status = RetryStatus::Pending.as_str().to_string();
                row.claimed_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_retries(&self, connection_id: Option<&str>) -> Result<Vec<RetryRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<RetryRecord> = inner
            .rows
            .iter()
            .filter(|r| connection_id.map_or(true, |c| r.connection_id == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.connection_id.cmp(&b.connection_id).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}
