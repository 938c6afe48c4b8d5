use serde::Serialize;

use relay_store::run_migrations;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, StoreArgs};

use super::config::{connect_store, require_database_url};

#[derive(Serialize)]
struct MigrateResult {
    success: bool,
    message: String,
}

pub async fn migrate_cmd(store: StoreArgs, output: OutputArgs) -> i32 {
    let database_url = match require_database_url(&store, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let pg = match connect_store(&database_url, store.max_connections, &output).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    match run_migrations(pg.pool()).await {
        Ok(()) => {
            let result = MigrateResult {
                success: true,
                message: "migrations applied".to_string(),
            };
            if output.format == OutputFormat::Text && !output.quiet {
                println!("ok: migrations applied");
            } else {
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &format!("migration failed: {e}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}
