use std::time::Duration;

use relay_core::RunResult;

use crate::retry::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Nothing failed in a retriable way.
    NotNeeded,
    RetryAfter { retry_num: u32, delay: Duration },
    /// The lineage reached `max_tries`.
    Exhausted { retry_num: u32 },
}

/// Retry count after an attempt: an attempt with any success restarts the
/// count, an attempt with none advances it.
pub fn next_retry_num(current: u32, successful_hits: u64) -> u32 {
    if successful_hits == 0 {
        current.saturating_add(1)
    } else {
        0
    }
}

/// Backoff in time units for retry `retry_num`:
/// `10^(n-1) + uniform(0, 10^(n-2))`, rounded.
///
/// The base exponent is floored at 0 and the jitter term is dropped while its
/// exponent is negative, so retries 0 and 1 wait exactly one unit.
pub fn backoff_units(retry_num: u32, rand_u64: impl Fn() -> u64) -> u64 {
    let n = retry_num as i32;
    let base = 10f64.powi((n - 1).max(0));
    let jitter = if n >= 2 {
        let fraction = rand_u64() as f64 / u64::MAX as f64;
        fraction * 10f64.powi(n - 2)
    } else {
        0.0
    };
    let units = (base + jitter).round();
    if units >= u64::MAX as f64 {
        u64::MAX
    } else {
        units as u64
    }
}

pub fn backoff_delay(units: u64, time_unit: Duration) -> Duration {
    Duration::try_from_secs_f64(time_unit.as_secs_f64() * units as f64).unwrap_or(Duration::MAX)
}

/// Decide what follows a completed attempt.
///
/// - `current`: retry count of the lineage the attempt belonged to (0 for a
///   regular run).
/// - `rand_u64`: RNG for the jitter term.
pub fn decide_retry(
    cfg: &RetryConfig,
    current: u32,
    result: &RunResult,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    if !result.has_retriable() {
        return RetryDecision::NotNeeded;
    }

    let retry_num = next_retry_num(current, result.successful_hits);
    if retry_num >= cfg.max_tries {
        return RetryDecision::Exhausted { retry_num };
    }

    let units = backoff_units(retry_num, rand_u64);
    RetryDecision::RetryAfter {
        retry_num,
        delay: backoff_delay(units, cfg.time_unit),
    }
}
