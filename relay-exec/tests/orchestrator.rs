use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_core::{ConnectorConfig, ProtocolSchema, Record, ValidationResult};
use relay_exec::executor::{Event, EventSink, NoOpEventSink, Orchestrator};
use relay_exec::{
    Destination, Executor, ExecutorConfig, PartialFailureIndexMap, RegisteredConnection, RetryOutcome,
    SendError, Source, SourceError,
};
use relay_store::{MemoryStore, RetryStore};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// Source serving `total` numbered records, optionally failing at one offset.
struct CountingSource {
    total: usize,
    fail_at: Option<usize>,
    pulls: Mutex<Vec<(usize, usize)>>,
}

impl CountingSource {
    fn new(total: usize) -> Self {
        Self {
            total,
            fail_at: None,
            pulls: Mutex::new(Vec::new()),
        }
    }

    fn pulls(&self) -> Vec<(usize, usize)> {
        self.pulls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Source for CountingSource {
    fn kind(&self) -> &str {
        "counting"
    }

    async fn get_data(
        &self,
        _fields: &[String],
        offset: usize,
        limit: usize,
        _credentials: Option<&JsonValue>,
    ) -> Result<Vec<Record>, SourceError> {
        self.pulls.lock().unwrap().push((offset, limit));
        if self.fail_at == Some(offset) {
            return Err(SourceError::Other("connection reset".to_string()));
        }
        let end = (offset + limit).min(self.total);
        Ok((offset.min(end)..end)
            .map(|i| Record::new().with("n", i as u64).with("customer_id", "c"))
            .collect())
    }

    fn schema(&self) -> ProtocolSchema {
        ProtocolSchema::new("counting")
    }

    fn validate(&self) -> ValidationResult {
        ValidationResult::valid()
    }
}

// Destination accepting everything except records whose `n` is listed in `reject`.
struct RejectingDestination {
    batch_size: usize,
    reject: Vec<u64>,
}

#[async_trait]
impl Destination for RejectingDestination {
    fn kind(&self) -> &str {
        "log"
    }

    fn fields(&self) -> Vec<String> {
        vec!["n".to_string(), "customer_id".to_string()]
    }

    fn partition_key(&self) -> Option<&str> {
        Some("customer_id")
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn validate(&self) -> ValidationResult {
        ValidationResult::valid()
    }

    fn schema(&self) -> ProtocolSchema {
        ProtocolSchema::new("rejecting")
    }

    async fn send_group(
        &self,
        _key: Option<&str>,
        records: &[Record],
    ) -> Result<PartialFailureIndexMap, SendError> {
        Ok(records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.get("n")
                    .and_then(JsonValue::as_u64)
                    .is_some_and(|n| self.reject.contains(&n))
            })
            .map(|(i, _)| (i, "rejected".to_string()))
            .collect())
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn exact_batch_triggers_one_more_pull() {
    let source = CountingSource::new(2000);
    let destination = RejectingDestination {
        batch_size: 2000,
        reject: vec![],
    };
    let orchestrator = Orchestrator {
        run_id: Uuid::new_v4(),
        connection: "c1",
        source: &source,
        destination: &destination,
        credentials: None,
        events: &NoOpEventSink,
    };

    let result = orchestrator.run(false).await;
    assert_eq!(result.successful_hits, 2000);
    assert_eq!(source.pulls(), vec![(0, 2000), (2000, 2000)]);
}

#[tokio::test]
async fn short_pull_ends_the_run() {
    let source = CountingSource::new(5);
    let destination = RejectingDestination {
        batch_size: 2,
        reject: vec![1, 4],
    };
    let sink = CollectingSink::default();
    let orchestrator = Orchestrator {
        run_id: Uuid::new_v4(),
        connection: "c1",
        source: &source,
        destination: &destination,
        credentials: None,
        events: &sink,
    };

    let result = orchestrator.run(false).await;
    assert_eq!(source.pulls(), vec![(0, 2), (2, 2), (4, 2)]);
    assert_eq!(result.successful_hits, 3);
    assert_eq!(result.failed_hits, 2);
    let failed: Vec<u64> = result
        .retriable_events
        .iter()
        .filter_map(|r| r.get("n").and_then(JsonValue::as_u64))
        .collect();
    assert_eq!(failed, vec![1, 4]);

    let batches = sink
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, Event::BatchDelivered { .. }))
        .count();
    assert_eq!(batches, 3);
}

#[tokio::test]
async fn failures_in_later_batches_name_their_run_index() {
    let source = CountingSource::new(4);
    let destination = RejectingDestination {
        batch_size: 2,
        reject: vec![3],
    };
    let orchestrator = Orchestrator {
        run_id: Uuid::new_v4(),
        connection: "c1",
        source: &source,
        destination: &destination,
        credentials: None,
        events: &NoOpEventSink,
    };

    let result = orchestrator.run(false).await;
    assert_eq!(result.successful_hits, 3);
    assert_eq!(result.error_messages, vec!["rejected (record 3)".to_string()]);
}

#[tokio::test]
async fn empty_source_processes_nothing() {
    let source = CountingSource::new(0);
    let destination = RejectingDestination {
        batch_size: 10,
        reject: vec![],
    };
    let orchestrator = Orchestrator {
        run_id: Uuid::new_v4(),
        connection: "c1",
        source: &source,
        destination: &destination,
        credentials: None,
        events: &NoOpEventSink,
    };
    let result = orchestrator.run(false).await;
    assert_eq!(result.processed(), 0);
    assert!(result.error_messages.is_empty());
    assert_eq!(source.pulls(), vec![(0, 10)]);
}

#[tokio::test]
async fn source_error_keeps_delivered_batches() {
    let mut source = CountingSource::new(10);
    source.fail_at = Some(4);
    let destination = RejectingDestination {
        batch_size: 2,
        reject: vec![],
    };
    let orchestrator = Orchestrator {
        run_id: Uuid::new_v4(),
        connection: "c1",
        source: &source,
        destination: &destination,
        credentials: None,
        events: &NoOpEventSink,
    };

    let result = orchestrator.run(false).await;
    assert_eq!(result.successful_hits, 4);
    assert_eq!(result.failed_hits, 0);
    assert_eq!(result.error_messages.len(), 1);
    assert!(result.error_messages[0].contains("offset 4"));
}

#[tokio::test]
async fn dry_run_through_executor_schedules_nothing() {
    let store = Arc::new(MemoryStore::new());
    let config = ExecutorConfig {
        dry_run: true,
        ..Default::default()
    };
    let executor = Executor::new(config, store.clone(), Arc::new(NoOpEventSink));
    let conn = RegisteredConnection {
        name: "c1".to_string(),
        schedule: None,
        source: Arc::new(CountingSource::new(3)),
        destination: Arc::new(RejectingDestination {
            batch_size: 10,
            reject: vec![0, 1, 2],
        }),
        destination_config: ConnectorConfig::new("log"),
        credentials: None,
    };

    let outcome = executor.execute(&conn).await.unwrap();
    assert!(outcome.result.dry_run);
    assert_eq!(outcome.result.processed(), 0);
    assert_eq!(outcome.retry, RetryOutcome::NotNeeded);
    assert!(store.list_retries(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn execute_all_runs_every_connection() {
    let store = Arc::new(MemoryStore::new());
    let executor = Arc::new(Executor::new(
        ExecutorConfig::default(),
        store.clone(),
        Arc::new(NoOpEventSink),
    ));
    let conns: Vec<RegisteredConnection> = ["a", "b", "c"]
        .into_iter()
        .map(|name| RegisteredConnection {
            name: name.to_string(),
            schedule: None,
            source: Arc::new(CountingSource::new(4)),
            destination: Arc::new(RejectingDestination {
                batch_size: 3,
                reject: vec![],
            }),
            destination_config: ConnectorConfig::new("log"),
            credentials: None,
        })
        .collect();

    let results = executor.execute_all(conns).await;
    let names: Vec<_> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    for (_, outcome) in results {
        let outcome = outcome.unwrap();
        assert_eq!(outcome.result.successful_hits, 4);
        assert_eq!(outcome.retry, RetryOutcome::NotNeeded);
    }
}
