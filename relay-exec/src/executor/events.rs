use async_trait::async_trait;
use relay_core::RunSummary;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        connection: String,
        dry_run: bool,
        replay: Option<Uuid>,
    },
    BatchDelivered {
        run_id: Uuid,
        connection: String,
        offset: usize,
        records: usize,
        successful: u64,
        failed: u64,
    },
    SourceFailed {
        run_id: Uuid,
        connection: String,
        offset: usize,
        message: String,
    },
    RunFinished {
        run_id: Uuid,
        connection: String,
        summary: RunSummary,
    },
    RetryScheduled {
        connection: String,
        token: Uuid,
        run_name: String,
        retry_num: u32,
        delay_secs: u64,
    },
    RetryExhausted {
        connection: String,
        retry_num: u32,
        failed_hits: u64,
        retriable: usize,
    },
    RetryCompleted {
        connection: String,
        token: Uuid,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run.started",
            Event::BatchDelivered { .. } => "batch.delivered",
            Event::SourceFailed { .. } => "source.failed",
            Event::RunFinished { .. } => "run.finished",
            Event::RetryScheduled { .. } => "retry.scheduled",
            Event::RetryExhausted { .. } => "retry.exhausted",
            Event::RetryCompleted { .. } => "retry.completed",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let kind = self.kind();
        match self {
            Event::RunStarted { run_id, connection, dry_run, replay } => json!({
                "type": kind, "run_id": run_id.to_string(), "connection": connection,
                "dry_run": dry_run, "replay_token": replay.map(|t| t.to_string())
            }),
            Event::BatchDelivered { run_id, connection, offset, records, successful, failed } => json!({
                "type": kind, "run_id": run_id.to_string(), "connection": connection,
                "offset": offset, "records": records, "successful": successful, "failed": failed
            }),
            Event::SourceFailed { run_id, connection, offset, message } => json!({
                "type": kind, "run_id": run_id.to_string(), "connection": connection,
                "offset": offset, "message": message
            }),
            Event::RunFinished { run_id, connection, summary } => json!({
                "type": kind, "run_id": run_id.to_string(), "connection": connection,
                "summary": summary
            }),
            Event::RetryScheduled { connection, token, run_name, retry_num, delay_secs } => json!({
                "type": kind, "connection": connection, "token": token.to_string(),
                "run_name": run_name, "retry_num": retry_num, "delay_secs": delay_secs
            }),
            Event::RetryExhausted { connection, retry_num, failed_hits, retriable } => json!({
                "type": kind, "connection": connection, "retry_num": retry_num,
                "failed_hits": failed_hits, "retriable": retriable
            }),
            Event::RetryCompleted { connection, token } => json!({
                "type": kind, "connection": connection, "token": token.to_string()
            }),
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::RetryExhausted { .. } | Event::SourceFailed { .. } => {
                tracing::warn!(event = event.kind(), payload = %event.to_json(), "relay event")
            }
            _ => tracing::info!(event = event.kind(), payload = %event.to_json(), "relay event"),
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
