use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::record::Record;

/// Outcome of one send call, one batch, or a whole run.
///
/// Results combine field-wise: counts add, message and retriable sequences
/// concatenate in encounter order, and `dry_run` is true if either side is.
/// `successful_hits + failed_hits` is the number of records actually processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    pub successful_hits: u64,
    pub failed_hits: u64,
    pub error_messages: Vec<String>,
    pub dry_run: bool,
    /// Records whose delivery failed in a way worth retrying.
    pub retriable_events: Vec<Record>,
}

impl RunResult {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.successful_hits += 1;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed_hits += 1;
        self.error_messages.push(message.into());
    }

    pub fn record_retriable_failure(&mut self, message: impl Into<String>, record: Record) {
        self.record_failure(message);
        self.retriable_events.push(record);
    }

    pub fn processed(&self) -> u64 {
        self.successful_hits + self.failed_hits
    }

    pub fn has_retriable(&self) -> bool {
        !self.retriable_events.is_empty()
    }

    pub fn combine(mut self, other: RunResult) -> RunResult {
        self += other;
        self
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            successful_hits: self.successful_hits,
            failed_hits: self.failed_hits,
            error_messages: self.error_messages.clone(),
            dry_run: self.dry_run,
        }
    }
}

impl AddAssign for RunResult {
    fn add_assign(&mut self, other: RunResult) {
        self.successful_hits += other.successful_hits;
        self.failed_hits += other.failed_hits;
        self.error_messages.extend(other.error_messages);
        self.dry_run = self.dry_run || other.dry_run;
        self.retriable_events.extend(other.retriable_events);
    }
}

impl Add for RunResult {
    type Output = RunResult;

    fn add(self, other: RunResult) -> RunResult {
        self.combine(other)
    }
}

impl Sum for RunResult {
    fn sum<I: Iterator<Item = RunResult>>(iter: I) -> RunResult {
        iter.fold(RunResult::default(), Add::add)
    }
}

/// Terminal status payload of a run, as exposed to whatever triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub successful_hits: u64,
    pub failed_hits: u64,
    pub error_messages: Vec<String>,
    pub dry_run: bool,
}

impl From<&RunResult> for RunSummary {
    fn from(result: &RunResult) -> Self {
        result.summary()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub messages: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            messages: Vec::new(),
        }
    }

    pub fn invalid(messages: Vec<String>) -> Self {
        Self {
            is_valid: false,
            messages,
        }
    }
}
