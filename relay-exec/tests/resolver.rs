use std::collections::BTreeSet;

use proptest::prelude::*;
use relay_exec::{partial_failure_index_map, resolve, PartialFailureIndexMap, SendError};
use serde_json::json;

#[test]
fn transport_failure_fails_every_submitted_index() {
    let out = resolve(&[4, 7, 9], Err(SendError::Timeout));
    assert!(out.succeeded.is_empty());
    assert_eq!(
        out.failed,
        vec![
            (4, "timeout".to_string()),
            (7, "timeout".to_string()),
            (9, "timeout".to_string())
        ]
    );
}

#[test]
fn empty_map_means_everything_succeeded() {
    let out = resolve(&[0, 1, 2], Ok(PartialFailureIndexMap::new()));
    assert_eq!(out.succeeded, vec![0, 1, 2]);
    assert!(out.failed.is_empty());
}

#[test]
fn batch_local_indices_map_to_original_indices() {
    let mut map = PartialFailureIndexMap::new();
    map.insert(1, "bad value".to_string());
    let out = resolve(&[10, 12, 15], Ok(map));
    assert_eq!(out.succeeded, vec![10, 15]);
    assert_eq!(out.failed, vec![(12, "bad value".to_string())]);
}

#[test]
fn out_of_range_indices_are_ignored() {
    let mut map = PartialFailureIndexMap::new();
    map.insert(0, "first".to_string());
    map.insert(5, "nowhere".to_string());
    let out = resolve(&[3, 4], Ok(map));
    assert_eq!(out.succeeded, vec![4]);
    assert_eq!(out.failed, vec![(3, "first".to_string())]);
}

#[test]
fn partial_failure_response_is_parsed_and_fragments_concatenate() {
    let response = json!({
        "partialFailureError": {
            "code": 3,
            "message": "multiple errors",
            "details": [{
                "errors": [
                    {
                        "errorCode": {"conversionUploadError": "TOO_RECENT_CONVERSION_ACTION"},
                        "message": "too recent",
                        "location": {"fieldPathElements": [{"fieldName": "conversions", "index": 1}]}
                    },
                    {
                        "errorCode": {"conversionUploadError": "INVALID_VALUE"},
                        "message": "bad value",
                        "location": {"fieldPathElements": [
                            {"fieldName": "conversions", "index": 1},
                            {"fieldName": "conversion_value"}
                        ]}
                    },
                    {
                        "errorCode": {"fieldError": "REQUIRED"},
                        "message": "missing",
                        "location": {"fieldPathElements": [{"fieldName": "conversions", "index": 0}]}
                    }
                ]
            }]
        },
        "results": [{}, {}]
    });

    let map = partial_failure_index_map(&response);
    assert_eq!(map.len(), 2);
    assert_eq!(map[&0], "Code: fieldError.REQUIRED, Error: missing");
    assert_eq!(
        map[&1],
        "Code: conversionUploadError.TOO_RECENT_CONVERSION_ACTION, Error: too recent; \
         Code: conversionUploadError.INVALID_VALUE, Error: bad value"
    );
}

#[test]
fn zero_code_or_missing_error_means_no_partial_failure() {
    assert!(partial_failure_index_map(&json!({"results": []})).is_empty());
    assert!(partial_failure_index_map(&json!({
        "partialFailureError": {"code": 0, "details": [{"errors": [
            {"message": "ignored", "location": {"fieldPathElements": [{"index": 0}]}}
        ]}]}
    }))
    .is_empty());
}

#[test]
fn errors_without_index_are_skipped() {
    let map = partial_failure_index_map(&json!({
        "partialFailureError": {"code": 3, "details": [{"errors": [
            {"errorCode": "X", "message": "no location"}
        ]}]}
    }));
    assert!(map.is_empty());
}

proptest! {
    #[test]
    fn outcome_partitions_submitted_indices(
        submitted in proptest::collection::btree_set(0usize..10_000, 0..50),
        reported in proptest::collection::btree_set(0usize..80, 0..20),
        transport_failure in any::<bool>(),
    ) {
        let submitted: Vec<usize> = submitted.into_iter().collect();
        let outcome = if transport_failure {
            Err(SendError::Network("reset".to_string()))
        } else {
            Ok(reported.iter().map(|&i| (i, format!("err {i}"))).collect())
        };

        let out = resolve(&submitted, outcome);
        let ok: BTreeSet<usize> = out.succeeded.iter().copied().collect();
        let failed: BTreeSet<usize> = out.failed.iter().map(|(i, _)| *i).collect();

        prop_assert!(ok.is_disjoint(&failed));
        let all: BTreeSet<usize> = ok.union(&failed).copied().collect();
        let expected: BTreeSet<usize> = submitted.iter().copied().collect();
        prop_assert_eq!(all, expected);
        prop_assert_eq!(out.len(), submitted.len());
    }
}
