use relay_core::{ConfigError, RunSummary};
use relay_store::StoreError;

use uuid::Uuid;

use crate::connector::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("task join error: {0}")]
    TaskJoin(String),
    /// The run completed but its retry could not be recorded.
    #[error("run {run_id} finished but scheduling its retry failed: {source}")]
    Scheduling {
        run_id: Uuid,
        summary: Box<RunSummary>,
        #[source]
        source: StoreError,
    },
}

impl ExecutionError {
    /// Summary of the run, when it completed before the failure.
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            ExecutionError::Scheduling { summary, .. } => Some(&**summary),
            _ => None,
        }
    }
}
