use relay_core::RunResult;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::connector::{Destination, Source};
use crate::executor::events::{Event, EventSink};

/// Pull→send loop for one connection run.
///
/// Pulls `batch_size` records at a time starting at offset 0 and hands each
/// batch to the destination. A pull that returns exactly `batch_size` records
/// is followed by another at `offset + batch_size`; a shorter pull ends the run.
/// A failing pull also ends the run; batches already delivered keep their
/// accounting and the pull error is added to the error messages.
pub struct Orchestrator<'a> {
    pub run_id: Uuid,
    pub connection: &'a str,
    pub source: &'a dyn Source,
    pub destination: &'a dyn Destination,
    pub credentials: Option<&'a JsonValue>,
    pub events: &'a dyn EventSink,
}

impl Orchestrator<'_> {
    pub async fn run(&self, dry_run: bool) -> RunResult {
        let fields = self.destination.fields();
        let limit = self.destination.batch_size().max(1);
        let mut offset = 0usize;
        let mut result = RunResult::new(dry_run);

        loop {
            let batch = match self
                .source
                .get_data(&fields, offset, limit, self.credentials)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(connection = self.connection, offset, error = %e, "source pull failed");
                    self.events
                        .emit(Event::SourceFailed {
                            run_id: self.run_id,
                            connection: self.connection.to_string(),
                            offset,
                            message: e.to_string(),
                        })
                        .await;
                    result.error_messages.push(format!("source error at offset {offset}: {e}"));
                    break;
                }
            };

            let pulled = batch.len();
            if pulled == 0 {
                break;
            }

            let batch_result = self.destination.send_data_from(&batch, offset, dry_run).await;
            tracing::info!(
                connection = self.connection,
                offset,
                records = pulled,
                successful = batch_result.successful_hits,
                failed = batch_result.failed_hits,
                "batch delivered"
            );
            self.events
                .emit(Event::BatchDelivered {
                    run_id: self.run_id,
                    connection: self.connection.to_string(),
                    offset,
                    records: pulled,
                    successful: batch_result.successful_hits,
                    failed: batch_result.failed_hits,
                })
                .await;
            result += batch_result;

            if pulled < limit {
                break;
            }
            offset += limit;
        }

        tracing::info!(
            connection = self.connection,
            successful = result.successful_hits,
            failed = result.failed_hits,
            retriable = result.retriable_events.len(),
            dry_run,
            "run finished"
        );
        for message in &result.error_messages {
            tracing::debug!(connection = self.connection, error = %message, "record failed");
        }
        result
    }
}
