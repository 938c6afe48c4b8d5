use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retry count at which a lineage stops being rescheduled.
    pub max_tries: u32,
    /// Length of one backoff unit.
    pub time_unit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_tries: 3,
            time_unit: Duration::from_secs(60),
        }
    }
}
