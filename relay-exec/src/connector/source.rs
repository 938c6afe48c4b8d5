use async_trait::async_trait;
use relay_core::{ProtocolSchema, Record, ValidationResult};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::SourceError;

/// Identity of the retry generation a replay source is serving.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReplayLineage {
    pub connection_id: String,
    pub token: Uuid,
    pub retry_num: u32,
}

#[async_trait]
pub trait Source: Send + Sync {
    /// Connector type identifier, used in logs.
    fn kind(&self) -> &str;

    /// Up to `limit` records starting at `offset`. Fewer than `limit` means the
    /// data is exhausted; zero records ends the run.
    async fn get_data(
        &self,
        fields: &[String],
        offset: usize,
        limit: usize,
        credentials: Option<&JsonValue>,
    ) -> Result<Vec<Record>, SourceError>;

    fn schema(&self) -> ProtocolSchema;

    fn validate(&self) -> ValidationResult;

    /// Set only by sources replaying a persisted retry payload.
    fn lineage(&self) -> Option<ReplayLineage> {
        None
    }
}
