use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a connections document
    Validate { path: PathBuf },
    /// Run connections of a document and schedule retries for what failed
    Run {
        path: PathBuf,
        /// Run only the named connection (repeatable); default is every connection
        #[arg(long = "connection", value_name = "NAME")]
        connections: Vec<String>,
        /// Classify records without sending them or scheduling retries
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t = EventsMode::Tracing)]
        events: EventsMode,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Run retries whose scheduled time has passed
    Retries {
        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,
        #[arg(long, default_value_t = 5000)]
        poll_interval_ms: u64,
        /// Rows claimed per poll
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long, value_enum, default_value_t = EventsMode::Tracing)]
        events: EventsMode,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Show persisted retry rows
    ListRetries {
        #[arg(long)]
        connection: Option<String>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Apply retry store migrations
    Migrate {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// List supported connector types and their settings
    Connectors,
}
