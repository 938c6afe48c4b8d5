use proptest::prelude::*;
use relay_core::{Record, RunResult};

fn arb_result() -> impl Strategy<Value = RunResult> {
    (
        0u64..1_000,
        0u64..1_000,
        proptest::collection::vec("[a-z]{1,8}", 0..4),
        any::<bool>(),
    )
        .prop_map(|(ok, failed, messages, dry_run)| RunResult {
            successful_hits: ok,
            failed_hits: failed,
            error_messages: messages,
            dry_run,
            retriable_events: Vec::new(),
        })
}

proptest! {
    #[test]
    fn combination_is_commutative_on_counts(a in arb_result(), b in arb_result()) {
        let ab = a.clone() + b.clone();
        let ba = b + a;
        prop_assert_eq!(ab.successful_hits, ba.successful_hits);
        prop_assert_eq!(ab.failed_hits, ba.failed_hits);
        prop_assert_eq!(ab.dry_run, ba.dry_run);
    }

    #[test]
    fn combination_is_associative(a in arb_result(), b in arb_result(), c in arb_result()) {
        let left = (a.clone() + b.clone()) + c.clone();
        let right = a + (b + c);
        prop_assert_eq!(left, right);
    }

    #[test]
    fn dry_run_is_or_of_operands(a in arb_result(), b in arb_result()) {
        let expected = a.dry_run || b.dry_run;
        prop_assert_eq!((a + b).dry_run, expected);
    }

    #[test]
    fn default_is_identity(a in arb_result()) {
        prop_assert_eq!(a.clone() + RunResult::default(), a.clone());
        prop_assert_eq!(RunResult::default() + a.clone(), a);
    }
}

#[test]
fn messages_and_retriables_concatenate_in_encounter_order() {
    let mut first = RunResult::new(false);
    first.record_retriable_failure("e1", Record::new().with("i", 1));
    let mut second = RunResult::new(false);
    second.record_success();
    second.record_retriable_failure("e2", Record::new().with("i", 2));

    let total: RunResult = vec![first, second].into_iter().sum();
    assert_eq!(total.successful_hits, 1);
    assert_eq!(total.failed_hits, 2);
    assert_eq!(total.error_messages, vec!["e1", "e2"]);
    assert_eq!(
        total.retriable_events,
        vec![Record::new().with("i", 1), Record::new().with("i", 2)]
    );
    assert_eq!(total.processed(), 3);
}

#[test]
fn summary_serializes_camel_case() {
    let mut r = RunResult::new(true);
    r.record_failure("missing mandatory fields");
    let json = serde_json::to_value(r.summary()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "successfulHits": 0,
            "failedHits": 1,
            "errorMessages": ["missing mandatory fields"],
            "dryRun": true
        })
    );
}

#[test]
fn record_presence_treats_null_and_empty_as_missing() {
    let r = Record::new()
        .with("a", "x")
        .with("b", "")
        .with("c", serde_json::Value::Null)
        .with("d", 0);
    assert!(r.is_present("a"));
    assert!(!r.is_present("b"));
    assert!(!r.is_present("c"));
    assert!(r.is_present("d"));
    assert!(!r.is_present("e"));

    let required: Vec<String> = ["a", "b", "e"].iter().map(|s| s.to_string()).collect();
    assert_eq!(r.missing_fields(&required), vec!["b", "e"]);
}

#[test]
fn record_preserves_field_order_through_json() {
    let r = Record::new().with("z", 1).with("a", 2).with("m", 3);
    let text = serde_json::to_string(&r).unwrap();
    assert_eq!(text, r#"{"z":1,"a":2,"m":3}"#);
    let back: Record = serde_json::from_str(&text).unwrap();
    assert_eq!(back.fields().collect::<Vec<_>>(), vec!["z", "a", "m"]);
}
