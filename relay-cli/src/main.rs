use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod logging;
mod output;
mod utils;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "relay", version, about = "Batched record delivery with bounded retry")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    output: OutputArgs,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command, cli.output));
    std::process::exit(exit_code);
}

async fn run_command(command: Command, output: OutputArgs) -> i32 {
    match command {
        Command::Validate { path } => cmd::validate::validate_cmd(&path, output).await,
        Command::Run {
            path,
            connections,
            dry_run,
            events,
            store,
            retry,
        } => cmd::run::run_cmd(&path, &connections, dry_run, events, output, store, retry).await,
        Command::Retries {
            watch,
            poll_interval_ms,
            limit,
            events,
            store,
            retry,
        } => {
            cmd::retries::retries_cmd(
                watch,
                poll_interval_ms,
                limit,
                events,
                output,
                store,
                retry,
            )
            .await
        }
        Command::ListRetries { connection, store } => {
            cmd::list_retries::list_retries_cmd(connection.as_deref(), output, store).await
        }
        Command::Migrate { store } => cmd::migrate::migrate_cmd(store, output).await,
        Command::Connectors => cmd::connectors::connectors_cmd(output).await,
    }
}
