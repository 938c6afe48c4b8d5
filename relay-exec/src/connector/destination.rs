use std::collections::BTreeMap;

use async_trait::async_trait;
use relay_core::{ProtocolSchema, Record, RunResult, ValidationResult};

use super::SendError;

/// Batch-local index → error text for the records a destination rejected in
/// one call. Indices not present succeeded.
pub type PartialFailureIndexMap = BTreeMap<usize, String>;

#[async_trait]
pub trait Destination: Send + Sync {
    /// Connector type identifier, persisted with retry payloads.
    fn kind(&self) -> &str;

    /// Fields to pull from the source.
    fn fields(&self) -> Vec<String>;

    /// Fields every record must carry to be sent.
    fn required_fields(&self) -> Vec<String> {
        self.fields()
    }

    /// Field whose value splits a batch into independent send calls.
    fn partition_key(&self) -> Option<&str> {
        None
    }

    fn batch_size(&self) -> usize;

    fn validate(&self) -> ValidationResult;

    fn schema(&self) -> ProtocolSchema;

    /// One remote call for records sharing a partition key value.
    async fn send_group(
        &self,
        key: Option<&str>,
        records: &[Record],
    ) -> Result<PartialFailureIndexMap, SendError>;

    /// Validate, group and send `records`, classifying every one of them.
    async fn send_data(&self, records: &[Record], dry_run: bool) -> RunResult {
        self.send_data_from(records, 0, dry_run).await
    }

    /// As [`Destination::send_data`] for a batch whose first record sits at
    /// `first_index` in the whole run.
    async fn send_data_from(&self, records: &[Record], first_index: usize, dry_run: bool) -> RunResult {
        crate::delivery::deliver(self, records, first_index, dry_run).await
    }
}
