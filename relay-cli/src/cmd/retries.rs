use std::sync::Arc;
use std::time::Duration;

use relay_exec::executor::PollReport;
use relay_exec::{Executor, Registry, RetryPoller};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{EventsMode, OutputArgs, RetryArgs, StoreArgs};

use super::config::{build_executor_config, event_sink, http_client, open_store};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetriesResult {
    claimed: usize,
    completed: Vec<serde_json::Value>,
    errors: Vec<relay_exec::executor::PollError>,
}

impl From<PollReport> for RetriesResult {
    fn from(report: PollReport) -> Self {
        Self {
            claimed: report.claimed,
            completed: report
                .outcomes
                .iter()
                .map(|o| {
                    serde_json::json!({
                        "connection": o.connection,
                        "runId": o.run_id.to_string(),
                        "summary": o.summary(),
                        "retry": o.retry,
                    })
                })
                .collect(),
            errors: report.errors,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn retries_cmd(
    watch: bool,
    poll_interval_ms: u64,
    limit: i64,
    events: EventsMode,
    output: OutputArgs,
    store: StoreArgs,
    retry: RetryArgs,
) -> i32 {
    let retry_store = match open_store(&store, &output).await {
        Ok(s) => s,
        Err(code) => return code,
    };
    let http = match http_client(&output) {
        Ok(h) => h,
        Err(code) => return code,
    };

    let executor = Arc::new(Executor::new(
        build_executor_config(false, &retry),
        Arc::clone(&retry_store),
        event_sink(events),
    ));
    let poller = RetryPoller::new(executor, Arc::new(Registry::new(http)), retry_store);

    if watch {
        tracing::info!(poll_interval_ms, limit, "watching for due retries");
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };
        poller
            .run_until(limit, Duration::from_millis(poll_interval_ms), shutdown)
            .await;
        return exit_codes::SUCCESS;
    }

    let report = match poller.poll_once(limit).await {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("retry poll failed: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let failed = report
        .outcomes
        .iter()
        .any(|o| o.result.failed_hits > 0)
        || !report.errors.is_empty();
    let result = RetriesResult::from(report);

    if output.format == OutputFormat::Text && !output.quiet {
        println!(
            "claimed {} due retries: {} ran, {} could not run",
            result.claimed,
            result.completed.len(),
            result.errors.len()
        );
        for e in &result.errors {
            eprintln!("- {} ({}): {}", e.connection, e.run_name, e.message);
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if failed {
        exit_codes::RUN_FAILED
    } else {
        exit_codes::SUCCESS
    }
}
