//! Reconciles the outcome of one send call with the records submitted in it.
//!
//! Destinations report failures by their position within the call. The
//! resolver maps those positions back to the indices the caller submitted and
//! guarantees that every submitted index ends up in exactly one of
//! [`BatchOutcome::succeeded`] or [`BatchOutcome::failed`].

mod response;

use relay_core::{Record, RunResult};

use crate::connector::{PartialFailureIndexMap, SendError};

pub use response::partial_failure_index_map;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: Vec<usize>,
    /// `(original index, error text)` in submission order.
    pub failed: Vec<(usize, String)>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold into `result`. Failed records are retriable and are cloned out of
    /// `records`, which must be the slice the indices refer to. Messages name
    /// each record by `first_index + idx`.
    pub fn apply(&self, records: &[Record], first_index: usize, result: &mut RunResult) {
        for _ in &self.succeeded {
            result.record_success();
        }
        for (idx, message) in &self.failed {
            let message = format!("{message} (record {})", first_index + idx);
            match records.get(*idx) {
                Some(record) => result.record_retriable_failure(message, record.clone()),
                None => result.record_failure(message),
            }
        }
    }
}

/// Map a call outcome onto the submitted original indices.
///
/// `submitted[i]` is the original index of the record sent at position `i`.
pub fn resolve(
    submitted: &[usize],
    outcome: Result<PartialFailureIndexMap, SendError>,
) -> BatchOutcome {
    let failures = match outcome {
        Err(e) => {
            let message = e.to_string();
            return BatchOutcome {
                succeeded: Vec::new(),
                failed: submitted.iter().map(|&i| (i, message.clone())).collect(),
            };
        }
        Ok(map) => map,
    };

    for (&local, message) in failures.range(submitted.len()..) {
        tracing::warn!(
            index = local,
            submitted = submitted.len(),
            error = %message,
            "destination reported a failure outside the submitted range; ignoring"
        );
    }

    let mut out = BatchOutcome::default();
    for (local, &original) in submitted.iter().enumerate() {
        match failures.get(&local) {
            Some(message) => out.failed.push((original, message.clone())),
            None => out.succeeded.push(original),
        }
    }
    out
}
