use relay_store::RetryRecord;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, StoreArgs};

use super::config::open_store;

/// A retry row without its payload or destination settings, which may carry
/// credentials.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetryRow {
    connection_id: String,
    token: String,
    run_name: String,
    retry_num: i32,
    destination_type: String,
    status: String,
    records: usize,
    next_run_at: String,
    created_at: String,
}

impl From<&RetryRecord> for RetryRow {
    fn from(r: &RetryRecord) -> Self {
        Self {
            connection_id: r.connection_id.clone(),
            token: r.token.to_string(),
            run_name: r.run_name.clone(),
            retry_num: r.retry_num,
            destination_type: r.destination_type.clone(),
            status: r.status.clone(),
            records: r.records().map(|v| v.len()).unwrap_or(0),
            next_run_at: r.next_run_at.to_rfc3339(),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

pub async fn list_retries_cmd(connection: Option<&str>, output: OutputArgs, store: StoreArgs) -> i32 {
    let retry_store = match open_store(&store, &output).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let rows = match retry_store.list_retries(connection).await {
        Ok(rows) => rows,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("failed to list retries: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let rows: Vec<RetryRow> = rows.iter().map(RetryRow::from).collect();

    if output.format == OutputFormat::Text && !output.quiet {
        if rows.is_empty() {
            println!("no retries");
        }
        for r in &rows {
            println!(
                "{}\t{}\t#{}\t{}\t{} records\tnext {}",
                r.connection_id, r.run_name, r.retry_num, r.status, r.records, r.next_run_at
            );
        }
    } else {
        print_result(output.format, output.quiet, &rows);
    }
    exit_codes::SUCCESS
}
