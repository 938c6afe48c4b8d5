use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use relay_core::{ConnectorConfig, RunResult};
use relay_store::{NewRetry, RetryStore, StoreError};
use uuid::Uuid;

use crate::connector::ReplayLineage;
use crate::executor::{Event, EventSink};
use crate::retry::config::RetryConfig;
use crate::retry::decision::{decide_retry, RetryDecision};

pub type RandU64 = Arc<dyn Fn() -> u64 + Send + Sync>;

/// What a completed run is being judged against.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    pub connection: &'a str,
    pub destination_type: &'a str,
    pub destination_config: &'a ConnectorConfig,
    /// Set when the run replayed a persisted payload.
    pub lineage: Option<&'a ReplayLineage>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetryOutcome {
    NotNeeded,
    Scheduled {
        run_name: String,
        token: Uuid,
        retry_num: u32,
        next_run_at: DateTime<Utc>,
        delay_secs: u64,
    },
    Exhausted {
        retry_num: u32,
        failed_hits: u64,
    },
}

/// Turns the retriable remainder of a run into the next retry generation.
///
/// The new payload is persisted before the generation it replaces is removed,
/// so a crash in between leaves at worst a duplicate, never a gap.
pub struct RetryScheduler {
    config: RetryConfig,
    store: Arc<dyn RetryStore>,
    events: Arc<dyn EventSink>,
    rand_u64: RandU64,
}

impl RetryScheduler {
    pub fn new(
        config: RetryConfig,
        store: Arc<dyn RetryStore>,
        events: Arc<dyn EventSink>,
        rand_u64: RandU64,
    ) -> Self {
        Self {
            config,
            store,
            events,
            rand_u64,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn schedule(
        &self,
        ctx: RetryContext<'_>,
        result: &RunResult,
    ) -> Result<RetryOutcome, StoreError> {
        if result.dry_run {
            return Ok(RetryOutcome::NotNeeded);
        }

        let current = ctx.lineage.map(|l| l.retry_num).unwrap_or(0);
        let rand = Arc::clone(&self.rand_u64);
        match decide_retry(&self.config, current, result, move || rand()) {
            RetryDecision::NotNeeded => {
                if let Some(lineage) = ctx.lineage {
                    self.store
                        .delete_retry(&lineage.connection_id, lineage.token)
                        .await?;
                    tracing::info!(
                        connection = ctx.connection,
                        token = %lineage.token,
                        retry_num = lineage.retry_num,
                        "retry lineage completed"
                    );
                    self.events
                        .emit(Event::RetryCompleted {
                            connection: ctx.connection.to_string(),
                            token: lineage.token,
                        })
                        .await;
                }
                Ok(RetryOutcome::NotNeeded)
            }
            RetryDecision::Exhausted { retry_num } => {
                tracing::error!(
                    connection = ctx.connection,
                    retry_num,
                    max_tries = self.config.max_tries,
                    failed_hits = result.failed_hits,
                    retriable = result.retriable_events.len(),
                    "retries exhausted; failed records will not be retried"
                );
                if let Some(lineage) = ctx.lineage {
                    self.store
                        .mark_exhausted(&lineage.connection_id, lineage.token)
                        .await?;
                }
                self.events
                    .emit(Event::RetryExhausted {
                        connection: ctx.connection.to_string(),
                        retry_num,
                        failed_hits: result.failed_hits,
                        retriable: result.retriable_events.len(),
                    })
                    .await;
                Ok(RetryOutcome::Exhausted {
                    retry_num,
                    failed_hits: result.failed_hits,
                })
            }
            RetryDecision::RetryAfter { retry_num, delay } => {
                self.persist(ctx, result, retry_num, delay).await
            }
        }
    }

    async fn persist(
        &self,
        ctx: RetryContext<'_>,
        result: &RunResult,
        retry_num: u32,
        delay: Duration,
    ) -> Result<RetryOutcome, StoreError> {
        // A regular run supersedes whatever retry is still live for the connection.
        let prior = match ctx.lineage {
            Some(lineage) => Some((lineage.connection_id.clone(), lineage.token)),
            None => self
                .store
                .current_retry(ctx.connection)
                .await?
                .map(|row| (row.connection_id, row.token)),
        };

        let token = Uuid::new_v4();
        let run_name = format!("{}_retry_{retry_num}", ctx.connection);
        let next_run_at = next_run_at(Utc::now(), delay);

        let retry = NewRetry::new(
            ctx.connection,
            token,
            run_name.clone(),
            i32::try_from(retry_num).unwrap_or(i32::MAX),
            ctx.destination_type,
            ctx.destination_config.to_json(),
            &result.retriable_events,
            next_run_at,
        )?;
        self.store.insert_retry(retry).await?;

        if let Some((connection_id, prior_token)) = prior {
            self.store.delete_retry(&connection_id, prior_token).await?;
            tracing::debug!(
                connection = ctx.connection,
                token = %prior_token,
                "prior retry superseded"
            );
        }

        tracing::info!(
            connection = ctx.connection,
            run_name = %run_name,
            token = %token,
            retry_num,
            records = result.retriable_events.len(),
            delay_secs = delay.as_secs(),
            "retry scheduled"
        );
        self.events
            .emit(Event::RetryScheduled {
                connection: ctx.connection.to_string(),
                token,
                run_name: run_name.clone(),
                retry_num,
                delay_secs: delay.as_secs(),
            })
            .await;

        Ok(RetryOutcome::Scheduled {
            run_name,
            token,
            retry_num,
            next_run_at,
            delay_secs: delay.as_secs(),
        })
    }
}

fn next_run_at(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
