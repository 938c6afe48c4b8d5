use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{ConnectorConfig, ProtocolSchema, Record, RunResult, ValidationResult};
use relay_exec::connectors::InlineSource;
use relay_exec::executor::NoOpEventSink;
use relay_exec::retry::{
    backoff_delay, backoff_units, decide_retry, next_retry_num, RetryDecision,
};
use relay_exec::{
    Destination, ExecutionError, Executor, ExecutorConfig, PartialFailureIndexMap,
    RegisteredConnection, ReplaySource, RetryConfig, RetryOutcome, SendError,
};
use relay_store::{
    MemoryStore, NewRetry, RetryRecord, RetryStatus, RetryStore, StoreError,
};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

#[test]
fn first_retries_wait_one_unit() {
    assert_eq!(backoff_units(0, || u64::MAX), 1);
    assert_eq!(backoff_units(1, || u64::MAX), 1);
}

#[test]
fn backoff_grows_by_powers_of_ten_with_bounded_jitter() {
    assert_eq!(backoff_units(2, || 0), 10);
    assert_eq!(backoff_units(2, || u64::MAX), 11);
    assert_eq!(backoff_units(3, || 0), 100);
    assert_eq!(backoff_units(3, || u64::MAX), 110);
    let mid = backoff_units(3, || u64::MAX / 2);
    assert!((100..=110).contains(&mid), "got {mid}");
}

#[test]
fn backoff_delay_scales_time_unit() {
    assert_eq!(backoff_delay(10, Duration::from_secs(60)), Duration::from_secs(600));
    assert_eq!(backoff_delay(u64::MAX, Duration::from_secs(u64::MAX)), Duration::MAX);
}

#[test]
fn any_success_resets_the_count() {
    assert_eq!(next_retry_num(0, 0), 1);
    assert_eq!(next_retry_num(2, 0), 3);
    assert_eq!(next_retry_num(2, 1), 0);
}

fn failed_run(successful: u64, retriable: usize) -> RunResult {
    let mut result = RunResult::new(false);
    for _ in 0..successful {
        result.record_success();
    }
    for i in 0..retriable {
        result.record_retriable_failure(format!("failed {i}"), Record::new().with("n", i as u64));
    }
    result
}

#[test]
fn decision_follows_count_and_max_tries() {
    let cfg = RetryConfig::default();
    assert_eq!(
        decide_retry(&cfg, 0, &failed_run(5, 0), || 0),
        RetryDecision::NotNeeded
    );
    assert_eq!(
        decide_retry(&cfg, 0, &failed_run(0, 2), || 0),
        RetryDecision::RetryAfter {
            retry_num: 1,
            delay: Duration::from_secs(60)
        }
    );
    assert_eq!(
        decide_retry(&cfg, 1, &failed_run(0, 2), || 0),
        RetryDecision::RetryAfter {
            retry_num: 2,
            delay: Duration::from_secs(600)
        }
    );
    assert_eq!(
        decide_retry(&cfg, 2, &failed_run(0, 2), || 0),
        RetryDecision::Exhausted { retry_num: 3 }
    );
    // partial success after two failures starts over at zero
    assert_eq!(
        decide_retry(&cfg, 2, &failed_run(1, 2), || 0),
        RetryDecision::RetryAfter {
            retry_num: 0,
            delay: Duration::from_secs(60)
        }
    );
}

#[test]
fn non_retriable_failures_never_schedule() {
    let mut result = RunResult::new(false);
    result.record_failure("missing mandatory fields: x (record 0)");
    assert_eq!(
        decide_retry(&RetryConfig::default(), 0, &result, || 0),
        RetryDecision::NotNeeded
    );
}

// Rejects every record whose `n` is in `reject`; the set can change between runs.
struct FlakyDestination {
    reject: Mutex<BTreeSet<u64>>,
}

impl FlakyDestination {
    fn rejecting(ns: &[u64]) -> Self {
        Self {
            reject: Mutex::new(ns.iter().copied().collect()),
        }
    }

    fn set_rejecting(&self, ns: &[u64]) {
        *self.reject.lock().unwrap() = ns.iter().copied().collect();
    }
}

#[async_trait]
impl Destination for FlakyDestination {
    fn kind(&self) -> &str {
        "log"
    }

    fn fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn required_fields(&self) -> Vec<String> {
        vec!["n".to_string()]
    }

    fn batch_size(&self) -> usize {
        2
    }

    fn validate(&self) -> ValidationResult {
        ValidationResult::valid()
    }

    fn schema(&self) -> ProtocolSchema {
        ProtocolSchema::new("flaky")
    }

    async fn send_group(
        &self,
        _key: Option<&str>,
        records: &[Record],
    ) -> Result<PartialFailureIndexMap, SendError> {
        let reject = self.reject.lock().unwrap().clone();
        Ok(records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.get("n").and_then(JsonValue::as_u64).is_some_and(|n| reject.contains(&n)))
            .map(|(i, _)| (i, "rejected".to_string()))
            .collect())
    }
}

fn records(n: u64) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new().with("n", i).with("label", format!("r{i}")))
        .collect()
}

struct Harness {
    store: Arc<MemoryStore>,
    executor: Executor,
    destination: Arc<FlakyDestination>,
    conn: RegisteredConnection,
}

fn harness(input: Vec<Record>, reject: &[u64]) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let executor = Executor::with_rng(
        ExecutorConfig::default(),
        store.clone(),
        Arc::new(NoOpEventSink),
        Arc::new(|| 0u64),
    );
    let destination = Arc::new(FlakyDestination::rejecting(reject));
    let conn = RegisteredConnection {
        name: "orders".to_string(),
        schedule: None,
        source: Arc::new(InlineSource::new(input)),
        destination: destination.clone(),
        destination_config: ConnectorConfig::new("log").with("batch_size", json!(2)),
        credentials: None,
    };
    Harness {
        store,
        executor,
        destination,
        conn,
    }
}

impl Harness {
    async fn replay_current(&self) -> relay_exec::ConnectionOutcome {
        let row = self
            .store
            .current_retry(&self.conn.name)
            .await
            .unwrap()
            .expect("a pending retry");
        let replay = ReplaySource::from_record(&row, 2).unwrap();
        self.executor
            .execute_with_source(&self.conn, &replay)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn retriable_failures_are_persisted_as_first_generation() {
    let h = harness(records(5), &[1, 3]);
    let outcome = h.executor.execute(&h.conn).await.unwrap();

    assert_eq!(outcome.result.successful_hits, 3);
    match &outcome.retry {
        RetryOutcome::Scheduled {
            run_name,
            retry_num,
            delay_secs,
            ..
        } => {
            // any success resets the count, so this is generation zero
            assert_eq!(*retry_num, 0);
            assert_eq!(run_name, "orders_retry_0");
            assert_eq!(*delay_secs, 60);
        }
        other => panic!("expected a scheduled retry, got {other:?}"),
    }

    let rows = h.store.list_retries(Some("orders")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].destination_type, "log");
    assert_eq!(rows[0].destination_config["batch_size"], json!(2));
    assert_eq!(rows[0].status().unwrap(), RetryStatus::Pending);
}

#[tokio::test]
async fn replayed_payload_matches_the_failed_records_exactly() {
    let input = records(4);
    let h = harness(input.clone(), &[0, 2]);
    let outcome = h.executor.execute(&h.conn).await.unwrap();

    let row = h.store.current_retry("orders").await.unwrap().unwrap();
    let stored = row.records().unwrap();
    assert_eq!(stored, vec![input[0].clone(), input[2].clone()]);
    assert_eq!(stored, outcome.result.retriable_events);
    assert_eq!(row.data, serde_json::to_string(&outcome.result.retriable_events).unwrap());
    let keys: Vec<_> = stored[0].fields().collect();
    assert_eq!(keys, vec!["n", "label"]);
}

#[tokio::test]
async fn zero_success_attempts_exhaust_and_keep_the_row() {
    let h = harness(records(2), &[0, 1]);

    let first = h.executor.execute(&h.conn).await.unwrap();
    assert!(matches!(first.retry, RetryOutcome::Scheduled { retry_num: 1, .. }));

    let second = h.replay_current().await;
    assert!(matches!(second.retry, RetryOutcome::Scheduled { retry_num: 2, delay_secs: 600, .. }));
    // the prior generation is gone once the next one is written
    assert_eq!(h.store.len().await, 1);

    let last_row = h.store.current_retry("orders").await.unwrap().unwrap();
    let third = h.replay_current().await;
    assert_eq!(
        third.retry,
        RetryOutcome::Exhausted {
            retry_num: 3,
            failed_hits: 2
        }
    );

    let rows = h.store.list_retries(Some("orders")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, last_row.token);
    assert_eq!(rows[0].status().unwrap(), RetryStatus::Exhausted);
    assert!(h.store.current_retry("orders").await.unwrap().is_none());
}

#[tokio::test]
async fn partial_success_on_replay_restarts_the_count() {
    let h = harness(records(2), &[0, 1]);
    h.executor.execute(&h.conn).await.unwrap();
    h.replay_current().await;

    h.destination.set_rejecting(&[1]);
    let outcome = h.replay_current().await;
    assert_eq!(outcome.result.successful_hits, 1);
    assert!(matches!(outcome.retry, RetryOutcome::Scheduled { retry_num: 0, .. }));

    let row = h.store.current_retry("orders").await.unwrap().unwrap();
    assert_eq!(row.retry_num, 0);
    assert_eq!(row.records().unwrap().len(), 1);
}

#[tokio::test]
async fn clean_replay_completes_the_lineage() {
    let h = harness(records(3), &[2]);
    h.executor.execute(&h.conn).await.unwrap();
    assert_eq!(h.store.len().await, 1);

    h.destination.set_rejecting(&[]);
    let outcome = h.replay_current().await;
    assert_eq!(outcome.retry, RetryOutcome::NotNeeded);
    assert_eq!(outcome.result.successful_hits, 1);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn fully_successful_run_writes_nothing() {
    let h = harness(records(3), &[]);
    let outcome = h.executor.execute(&h.conn).await.unwrap();
    assert_eq!(outcome.retry, RetryOutcome::NotNeeded);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn later_regular_run_supersedes_the_pending_retry() {
    let h = harness(records(3), &[2]);
    h.executor.execute(&h.conn).await.unwrap();
    let first = h.store.current_retry("orders").await.unwrap().unwrap();

    let outcome = h.executor.execute(&h.conn).await.unwrap();
    let token = match outcome.retry {
        RetryOutcome::Scheduled { token, .. } => token,
        other => panic!("expected a scheduled retry, got {other:?}"),
    };

    let rows = h.store.list_retries(Some("orders")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, token);
    assert!(h.store.get_retry("orders", first.token).await.unwrap().is_none());
}

#[tokio::test]
async fn regular_run_without_failures_leaves_the_pending_retry() {
    let h = harness(records(3), &[2]);
    h.executor.execute(&h.conn).await.unwrap();

    h.destination.set_rejecting(&[]);
    h.executor.execute(&h.conn).await.unwrap();
    assert_eq!(h.store.len().await, 1);
}

// MemoryStore whose inserts always fail.
struct InsertFailingStore(MemoryStore);

#[async_trait]
impl RetryStore for InsertFailingStore {
    async fn insert_retry(&self, _retry: NewRetry) -> Result<RetryRecord, StoreError> {
        Err(StoreError::Other("disk full".to_string()))
    }

    async fn get_retry(&self, connection_id: &str, token: Uuid) -> Result<Option<RetryRecord>, StoreError> {
        self.0.get_retry(connection_id, token).await
    }

    async fn current_retry(&self, connection_id: &str) -> Result<Option<RetryRecord>, StoreError> {
        self.0.current_retry(connection_id).await
    }

    async fn delete_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        self.0.delete_retry(connection_id, token).await
    }

    async fn mark_exhausted(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        self.0.mark_exhausted(connection_id, token).await
    }

    async fn claim_due_retries(&self, limit: i64) -> Result<Vec<RetryRecord>, StoreError> {
        self.0.claim_due_retries(limit).await
    }

    async fn release_retry(&self, connection_id: &str, token: Uuid) -> Result<bool, StoreError> {
        self.0.release_retry(connection_id, token).await
    }

    async fn list_retries(&self, connection_id: Option<&str>) -> Result<Vec<RetryRecord>, StoreError> {
        self.0.list_retries(connection_id).await
    }
}

#[tokio::test]
async fn scheduling_failure_keeps_the_run_summary() {
    let h = harness(records(4), &[1]);
    let executor = Executor::with_rng(
        ExecutorConfig::default(),
        Arc::new(InsertFailingStore(MemoryStore::new())),
        Arc::new(NoOpEventSink),
        Arc::new(|| 0u64),
    );

    let err = executor.execute(&h.conn).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Scheduling { .. }), "{err}");
    let summary = err.summary().expect("summary of the finished run");
    assert_eq!(summary.successful_hits, 3);
    assert_eq!(summary.failed_hits, 1);
    assert!(err.to_string().contains("disk full"), "{err}");
}
