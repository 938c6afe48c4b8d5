use async_trait::async_trait;
use relay_core::{FieldType, ProtocolSchema, Record, ValidationResult};
use relay_store::{RetryRecord, RetryStore};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::connector::{ReplayLineage, Source, SourceError};

pub const REPLAY_KIND: &str = "replay";

/// Serves the records persisted for one retry generation, in their original
/// order, without re-fetching or re-validating them.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    lineage: ReplayLineage,
    batch_size: usize,
    records: Vec<Record>,
}

impl ReplaySource {
    pub fn new(lineage: ReplayLineage, batch_size: usize, records: Vec<Record>) -> Self {
        Self {
            lineage,
            batch_size,
            records,
        }
    }

    /// Build from a row already fetched or claimed from the store.
    pub fn from_record(row: &RetryRecord, batch_size: usize) -> Result<Self, SourceError> {
        let records = row
            .records()
            .map_err(|e| SourceError::Replay(format!("token {}: {e}", row.token)))?;
        let retry_num = u32::try_from(row.retry_num).map_err(|_| {
            SourceError::Replay(format!("token {}: negative retry_num {}", row.token, row.retry_num))
        })?;
        Ok(Self::new(
            ReplayLineage {
                connection_id: row.connection_id.clone(),
                token: row.token,
                retry_num,
            },
            batch_size,
            records,
        ))
    }

    pub async fn load(
        store: &dyn RetryStore,
        connection_id: &str,
        token: Uuid,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        let row = store
            .get_retry(connection_id, token)
            .await
            .map_err(|e| SourceError::Replay(e.to_string()))?
            .ok_or_else(|| {
                SourceError::Replay(format!("no retry payload for {connection_id} token {token}"))
            })?;
        Self::from_record(&row, batch_size)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn protocol_schema() -> ProtocolSchema {
        ProtocolSchema::new(REPLAY_KIND)
            .required("connection_id", FieldType::String, "connection the payload belongs to")
            .required("token", FieldType::String, "retry generation token")
            .required("retry_num", FieldType::Integer, "retry count of the generation")
    }
}

#[async_trait]
impl Source for ReplaySource {
    fn kind(&self) -> &str {
        REPLAY_KIND
    }

    async fn get_data(
        &self,
        _fields: &[String],
        offset: usize,
        limit: usize,
        _credentials: Option<&JsonValue>,
    ) -> Result<Vec<Record>, SourceError> {
        let start = offset.min(self.records.len());
        let end = offset.saturating_add(limit).min(self.records.len());
        Ok(self.records[start..end].to_vec())
    }

    fn schema(&self) -> ProtocolSchema {
        Self::protocol_schema()
    }

    fn validate(&self) -> ValidationResult {
        if self.batch_size == 0 {
            return ValidationResult::invalid(vec!["batch_size must be positive".to_string()]);
        }
        ValidationResult::valid()
    }

    fn lineage(&self) -> Option<ReplayLineage> {
        Some(self.lineage.clone())
    }
}
