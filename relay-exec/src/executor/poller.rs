use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relay_core::ConnectorConfig;
use relay_store::{RetryRecord, RetryStore, StoreError};
use uuid::Uuid;

use crate::executor::result::ExecutionError;
use crate::executor::runner::Executor;
use crate::executor::types::ConnectionOutcome;
use crate::registry::{RegisteredConnection, Registry};
use crate::replay::ReplaySource;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PollError {
    pub connection: String,
    pub token: Uuid,
    pub run_name: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct PollReport {
    pub claimed: usize,
    pub outcomes: Vec<ConnectionOutcome>,
    pub errors: Vec<PollError>,
}

/// Starts retry runs whose time has come.
///
/// Each claimed row becomes one run of its original destination fed by a
/// [`ReplaySource`]. Rows are independent: one failing never stops the rest.
pub struct RetryPoller {
    executor: Arc<Executor>,
    registry: Arc<Registry>,
    store: Arc<dyn RetryStore>,
}

impl RetryPoller {
    pub fn new(executor: Arc<Executor>, registry: Arc<Registry>, store: Arc<dyn RetryStore>) -> Self {
        Self {
            executor,
            registry,
            store,
        }
    }

    pub async fn poll_once(&self, limit: i64) -> Result<PollReport, StoreError> {
        let rows = self.store.claim_due_retries(limit).await?;
        let mut report = PollReport {
            claimed: rows.len(),
            ..Default::default()
        };

        for row in rows {
            match self.run_row(&row).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(message) => report.errors.push(PollError {
                    connection: row.connection_id.clone(),
                    token: row.token,
                    run_name: row.run_name.clone(),
                    message,
                }),
            }
        }

        if report.claimed > 0 {
            tracing::info!(
                claimed = report.claimed,
                completed = report.outcomes.len(),
                failed = report.errors.len(),
                "retry poll finished"
            );
        }
        Ok(report)
    }

    /// Poll every `interval` until `shutdown` resolves. A failing poll is
    /// logged and the loop carries on.
    pub async fn run_until<F>(&self, limit: i64, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            if let Err(e) = self.poll_once(limit).await {
                tracing::error!(error = %e, "retry poll failed");
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    async fn run_row(&self, row: &RetryRecord) -> Result<ConnectionOutcome, String> {
        let conn = match self.prepare(row) {
            Ok(conn) => conn,
            Err(message) => {
                tracing::error!(
                    connection = %row.connection_id,
                    token = %row.token,
                    error = %message,
                    "retry cannot be rebuilt; marking exhausted"
                );
                if let Err(e) = self.store.mark_exhausted(&row.connection_id, row.token).await {
                    tracing::error!(token = %row.token, error = %e, "failed to mark retry exhausted");
                }
                return Err(message);
            }
        };

        tracing::info!(
            connection = %row.connection_id,
            run_name = %row.run_name,
            token = %row.token,
            retry_num = row.retry_num,
            "starting retry run"
        );
        match self.executor.execute(&conn).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if matches!(e, ExecutionError::Store(_) | ExecutionError::Scheduling { .. }) {
                    if let Err(release) = self.store.release_retry(&row.connection_id, row.token).await {
                        tracing::error!(token = %row.token, error = %release, "failed to release retry");
                    }
                }
                Err(e.to_string())
            }
        }
    }

    fn prepare(&self, row: &RetryRecord) -> Result<RegisteredConnection, String> {
        let mut cfg = ConnectorConfig::from_json(row.destination_config.clone()).map_err(|e| e.to_string())?;
        if cfg.connector_type.is_none() {
            cfg.connector_type = Some(row.destination_type.clone());
        }
        let destination = self
            .registry
            .build_destination(&cfg)
            .map_err(|e| e.to_string())?;
        let source = ReplaySource::from_record(row, destination.batch_size()).map_err(|e| e.to_string())?;

        Ok(RegisteredConnection {
            name: row.connection_id.clone(),
            schedule: None,
            source: Arc::new(source),
            destination,
            destination_config: cfg,
            credentials: None,
        })
    }
}
