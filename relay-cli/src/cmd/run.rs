use std::path::Path;
use std::sync::Arc;

use relay_core::RunSummary;
use relay_exec::{ConnectionOutcome, ExecutionError, Executor, Registry, RetryOutcome};
use relay_store::{MemoryStore, RetryStore};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, print_warning, OutputFormat};
use crate::{EventsMode, OutputArgs, RetryArgs, StoreArgs};

use super::config::{
    build_executor_config, connect_store, event_sink, get_database_url, http_client, load_document,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionReport {
    connection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry: Option<RetryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ConnectionReport {
    fn from_outcome(name: String, outcome: Result<ConnectionOutcome, ExecutionError>) -> Self {
        match outcome {
            Ok(o) => Self {
                connection: name,
                run_id: Some(o.run_id.to_string()),
                summary: Some(o.summary()),
                retry: Some(o.retry),
                error: None,
            },
            Err(e) => Self {
                connection: name,
                run_id: match &e {
                    ExecutionError::Scheduling { run_id, .. } => Some(run_id.to_string()),
                    _ => None,
                },
                summary: e.summary().cloned(),
                retry: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn failed_hits(&self) -> u64 {
        self.summary.as_ref().map_or(0, |s| s.failed_hits)
    }
}

#[derive(Serialize)]
struct RunReport {
    connections: Vec<ConnectionReport>,
}

pub async fn run_cmd(
    path: &Path,
    selected: &[String],
    dry_run: bool,
    events: EventsMode,
    output: OutputArgs,
    store: StoreArgs,
    retry: RetryArgs,
) -> i32 {
    let mut doc = match load_document(path, &output) {
        Ok(d) => d,
        Err(code) => return code,
    };

    if !selected.is_empty() {
        if let Some(missing) = selected.iter().find(|n| doc.connection(n).is_none()) {
            print_error(
                output.format,
                output.quiet,
                &format!("no connection named `{missing}` in {}", path.display()),
            );
            return exit_codes::VALIDATION_FAILED;
        }
        doc.connections.retain(|c| selected.contains(&c.name));
    }

    let http = match http_client(&output) {
        Ok(h) => h,
        Err(code) => return code,
    };
    let registration = Registry::new(http).register_connections(&doc);
    let mut reports: Vec<ConnectionReport> = registration
        .errors
        .iter()
        .map(|e| ConnectionReport {
            connection: e.connection.clone(),
            run_id: None,
            summary: None,
            retry: None,
            error: Some(e.error.to_string()),
        })
        .collect();

    let retry_store: Arc<dyn RetryStore> = match get_database_url(&store) {
        Some(url) if !dry_run => match connect_store(&url, store.max_connections, &output).await {
            Ok(pg) => Arc::new(pg),
            Err(code) => return code,
        },
        Some(_) => Arc::new(MemoryStore::new()),
        None => {
            if !dry_run {
                print_warning(
                    output.format,
                    output.quiet,
                    "no database URL configured; retries are kept in memory and lost on exit",
                );
            }
            Arc::new(MemoryStore::new())
        }
    };

    let executor = Arc::new(Executor::new(
        build_executor_config(dry_run, &retry),
        retry_store,
        event_sink(events),
    ));
    let outcomes = executor.execute_all(registration.connections).await;
    let runtime_failure = outcomes.iter().any(|(_, o)| o.is_err());
    reports.extend(
        outcomes
            .into_iter()
            .map(|(name, outcome)| ConnectionReport::from_outcome(name, outcome)),
    );

    let code = if runtime_failure {
        exit_codes::RUNTIME_ERROR
    } else if !registration.errors.is_empty() {
        exit_codes::VALIDATION_FAILED
    } else if reports.iter().any(|r| r.failed_hits() > 0) {
        exit_codes::RUN_FAILED
    } else {
        exit_codes::SUCCESS
    };

    if output.format == OutputFormat::Text && !output.quiet {
        for r in &reports {
            print_text(r);
        }
    } else {
        print_result(output.format, output.quiet, &RunReport { connections: reports });
    }
    code
}

fn print_text(r: &ConnectionReport) {
    if let Some(error) = &r.error {
        eprintln!("error: {}: {error}", r.connection);
    }
    let Some(summary) = &r.summary else {
        return;
    };
    let mode = if summary.dry_run { " (dry run)" } else { "" };
    println!(
        "{}: successful={} failed={}{mode}",
        r.connection, summary.successful_hits, summary.failed_hits
    );
    for message in &summary.error_messages {
        println!("  - {message}");
    }
    match &r.retry {
        Some(RetryOutcome::Scheduled {
            run_name,
            retry_num,
            next_run_at,
            ..
        }) => println!("  retry {run_name} (#{retry_num}) scheduled for {next_run_at}"),
        Some(RetryOutcome::Exhausted { retry_num, .. }) => {
            println!("  retries exhausted after {retry_num} attempts")
        }
        Some(RetryOutcome::NotNeeded) | None => {}
    }
}
