use std::time::Duration;

use relay_core::{RunResult, RunSummary};
use uuid::Uuid;

use crate::retry::{RetryConfig, RetryOutcome};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Classify records without sending them or scheduling retries.
    pub dry_run: bool,
    pub retry: RetryConfig,
    /// Rows claimed per poll by the retry poller.
    pub poll_limit: i64,
    pub poll_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            retry: RetryConfig::default(),
            poll_limit: 10,
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Everything one connection run produced.
#[derive(Debug, Clone)]
pub struct ConnectionOutcome {
    pub connection: String,
    pub run_id: Uuid,
    pub result: RunResult,
    pub retry: RetryOutcome,
}

impl ConnectionOutcome {
    pub fn summary(&self) -> RunSummary {
        self.result.summary()
    }
}
