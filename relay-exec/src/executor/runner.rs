use std::sync::Arc;

use relay_store::RetryStore;
use uuid::Uuid;

use crate::connector::Source;
use crate::executor::events::{Event, EventSink};
use crate::executor::orchestrator::Orchestrator;
use crate::executor::result::ExecutionError;
use crate::executor::types::{ConnectionOutcome, ExecutorConfig};
use crate::registry::RegisteredConnection;
use crate::retry::{RandU64, RetryContext, RetryOutcome, RetryScheduler};

/// Runs connections and hands their outcome to the retry scheduler.
pub struct Executor {
    config: ExecutorConfig,
    events: Arc<dyn EventSink>,
    retries: RetryScheduler,
}

impl Executor {
    pub fn new(config: ExecutorConfig, store: Arc<dyn RetryStore>, events: Arc<dyn EventSink>) -> Self {
        Self::with_rng(config, store, events, Arc::new(|| fastrand::u64(..)))
    }

    /// Same as [`Executor::new`] with an explicit jitter source.
    pub fn with_rng(
        config: ExecutorConfig,
        store: Arc<dyn RetryStore>,
        events: Arc<dyn EventSink>,
        rand_u64: RandU64,
    ) -> Self {
        let retries = RetryScheduler::new(config.retry.clone(), store, Arc::clone(&events), rand_u64);
        Self {
            config,
            events,
            retries,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub async fn execute(&self, conn: &RegisteredConnection) -> Result<ConnectionOutcome, ExecutionError> {
        self.execute_with_source(conn, conn.source.as_ref()).await
    }

    /// Run `conn` pulling from `source` instead of its registered source.
    pub async fn execute_with_source(
        &self,
        conn: &RegisteredConnection,
        source: &dyn Source,
    ) -> Result<ConnectionOutcome, ExecutionError> {
        let run_id = Uuid::new_v4();
        let lineage = source.lineage();
        let dry_run = self.config.dry_run;

        tracing::info!(
            connection = %conn.name,
            run_id = %run_id,
            source = source.kind(),
            destination = conn.destination.kind(),
            retry_num = lineage.as_ref().map(|l| l.retry_num),
            dry_run,
            "run started"
        );
        self.events
            .emit(Event::RunStarted {
                run_id,
                connection: conn.name.clone(),
                dry_run,
                replay: lineage.as_ref().map(|l| l.token),
            })
            .await;

        let orchestrator = Orchestrator {
            run_id,
            connection: &conn.name,
            source,
            destination: conn.destination.as_ref(),
            credentials: conn.credentials.as_ref(),
            events: self.events.as_ref(),
        };
        let result = orchestrator.run(dry_run).await;

        self.events
            .emit(Event::RunFinished {
                run_id,
                connection: conn.name.clone(),
                summary: result.summary(),
            })
            .await;

        let retry = if dry_run {
            RetryOutcome::NotNeeded
        } else {
            let ctx = RetryContext {
                connection: &conn.name,
                destination_type: conn.destination.kind(),
                destination_config: &conn.destination_config,
                lineage: lineage.as_ref(),
            };
            self.retries
                .schedule(ctx, &result)
                .await
                .map_err(|source| ExecutionError::Scheduling {
                    run_id,
                    summary: Box::new(result.summary()),
                    source,
                })?
        };

        Ok(ConnectionOutcome {
            connection: conn.name.clone(),
            run_id,
            result,
            retry,
        })
    }

    /// Run every connection as its own task. Results come back in input order.
    pub async fn execute_all(
        self: &Arc<Self>,
        connections: Vec<RegisteredConnection>,
    ) -> Vec<(String, Result<ConnectionOutcome, ExecutionError>)> {
        let handles: Vec<_> = connections
            .into_iter()
            .map(|conn| {
                let executor = Arc::clone(self);
                let name = conn.name.clone();
                let handle = tokio::spawn(async move { executor.execute(&conn).await });
                (name, handle)
            })
            .collect();

        let names: Vec<String> = handles.iter().map(|(n, _)| n.clone()).collect();
        let joined = futures_util::future::join_all(handles.into_iter().map(|(_, h)| h)).await;

        names
            .into_iter()
            .zip(joined)
            .map(|(name, joined)| {
                let outcome = joined
                    .map_err(|e| ExecutionError::TaskJoin(format!("connection {name}: {e}")))
                    .and_then(|r| r);
                (name, outcome)
            })
            .collect()
    }
}
