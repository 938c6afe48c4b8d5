mod config;
mod decision;
mod scheduler;

pub use config::RetryConfig;
pub use decision::{backoff_delay, backoff_units, decide_retry, next_retry_num, RetryDecision};
pub use scheduler::{RandU64, RetryContext, RetryOutcome, RetryScheduler};
