use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use relay_core::{parse_document_str, validate_document, ConnectionsDocument, DocumentFormat};
use relay_exec::executor::{
    EventSink, HttpClient, NoOpEventSink, ReqwestHttpClient, StdoutEventSink, TracingEventSink,
};
use relay_exec::{ExecutorConfig, RetryConfig};
use relay_store::{PostgresStore, RetryStore};

use crate::exit_codes;
use crate::output::print_error;
use crate::utils::redact_url_password;
use crate::{EventsMode, OutputArgs, RetryArgs, StoreArgs};

/// Read, parse and validate a connections document. On failure the problem
/// has already been printed and the exit code is returned.
pub fn load_document(path: &Path, output: &OutputArgs) -> Result<ConnectionsDocument, i32> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read {}: {e}", path.display()),
        );
        exit_codes::RUNTIME_ERROR
    })?;

    let parsed = parse_document_str(&content, DocumentFormat::Auto).map_err(|e| {
        print_error(output.format, output.quiet, &e.to_string());
        exit_codes::VALIDATION_FAILED
    })?;

    validate_document(&parsed.document).map_err(|err| {
        for v in &err.violations {
            print_error(output.format, output.quiet, &format!("{}: {}", v.path, v.message));
        }
        exit_codes::VALIDATION_FAILED
    })?;

    Ok(parsed.document)
}

pub fn build_executor_config(dry_run: bool, retry: &RetryArgs) -> ExecutorConfig {
    ExecutorConfig {
        dry_run,
        retry: RetryConfig {
            max_tries: retry.max_tries,
            time_unit: Duration::from_secs(retry.retry_unit_secs),
        },
        ..Default::default()
    }
}

pub fn get_database_url(store: &StoreArgs) -> Option<String> {
    store
        .store
        .clone()
        .or_else(|| std::env::var("RELAY_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
}

pub fn require_database_url(store: &StoreArgs, output: &OutputArgs) -> Result<String, i32> {
    get_database_url(store).ok_or_else(|| {
        print_error(
            output.format,
            output.quiet,
            "missing database URL. Set --store <url>, RELAY_DATABASE_URL, or DATABASE_URL",
        );
        exit_codes::RUNTIME_ERROR
    })
}

pub async fn connect_store(
    url: &str,
    max_connections: u32,
    output: &OutputArgs,
) -> Result<PostgresStore, i32> {
    tracing::debug!(store = %redact_url_password(url), "connecting to retry store");
    PostgresStore::connect(url, max_connections).await.map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to connect to {}: {e}", redact_url_password(url)),
        );
        exit_codes::RUNTIME_ERROR
    })
}

pub async fn open_store(store: &StoreArgs, output: &OutputArgs) -> Result<Arc<dyn RetryStore>, i32> {
    let url = require_database_url(store, output)?;
    let pg = connect_store(&url, store.max_connections, output).await?;
    Ok(Arc::new(pg))
}

pub fn event_sink(mode: EventsMode) -> Arc<dyn EventSink> {
    match mode {
        EventsMode::Tracing => Arc::new(TracingEventSink),
        EventsMode::Stdout => Arc::new(StdoutEventSink),
        EventsMode::None => Arc::new(NoOpEventSink),
    }
}

pub fn http_client(output: &OutputArgs) -> Result<Arc<dyn HttpClient>, i32> {
    ReqwestHttpClient::new()
        .map(|c| Arc::new(c) as Arc<dyn HttpClient>)
        .map_err(|e| {
            print_error(output.format, output.quiet, &format!("failed to build HTTP client: {e}"));
            exit_codes::RUNTIME_ERROR
        })
}
