//! The send pipeline shared by every destination: required-field validation,
//! partition grouping, one call per group, and outcome resolution.

use relay_core::{Record, RunResult};

use crate::connector::Destination;
use crate::resolver::resolve;

/// Records sharing one partition key value, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionGroup {
    pub key: Option<String>,
    pub indices: Vec<usize>,
}

/// `first_index` is the run-level index of `records[0]`; messages and logs
/// name records by `first_index + position`.
pub async fn deliver<D>(destination: &D, records: &[Record], first_index: usize, dry_run: bool) -> RunResult
where
    D: Destination + ?Sized,
{
    let mut result = RunResult::new(dry_run);
    let required = destination.required_fields();

    let mut valid = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let missing = record.missing_fields(&required);
        if missing.is_empty() {
            valid.push(idx);
        } else {
            result.record_failure(format!(
                "missing mandatory fields: {} (record {})",
                missing.join(", "),
                first_index + idx
            ));
        }
    }

    if dry_run {
        tracing::debug!(
            destination = destination.kind(),
            valid = valid.len(),
            invalid = records.len() - valid.len(),
            "dry run; nothing sent"
        );
        return result;
    }

    for group in group_by_partition(destination.partition_key(), records, &valid) {
        let batch: Vec<Record> = group.indices.iter().map(|&i| records[i].clone()).collect();
        let outcome = destination.send_group(group.key.as_deref(), &batch).await;
        let resolved = resolve(&group.indices, outcome);

        tracing::debug!(
            destination = destination.kind(),
            partition = group.key.as_deref().unwrap_or("-"),
            succeeded = ?resolved.succeeded.iter().map(|i| first_index + i).collect::<Vec<_>>(),
            failed = ?resolved.failed.iter().map(|(i, _)| first_index + i).collect::<Vec<_>>(),
            "group delivered"
        );
        resolved.apply(records, first_index, &mut result);
    }

    result
}

/// Split `indices` by the value of `key`. Groups appear in order of first
/// occurrence. Without a key, or for records lacking it, the key is `None`.
pub fn group_by_partition(key: Option<&str>, records: &[Record], indices: &[usize]) -> Vec<PartitionGroup> {
    let mut groups: Vec<PartitionGroup> = Vec::new();
    for &idx in indices {
        let value = key.and_then(|k| records[idx].get_str(k));
        match groups.iter_mut().find(|g| g.key == value) {
            Some(group) => group.indices.push(idx),
            None => groups.push(PartitionGroup {
                key: value,
                indices: vec![idx],
            }),
        }
    }
    groups
}
