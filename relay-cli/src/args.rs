use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Postgres URL of the retry store
    #[arg(long)]
    pub store: Option<String>,
    #[arg(long, default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Debug, Args, Clone)]
pub struct RetryArgs {
    /// Retry count at which a lineage stops being rescheduled
    #[arg(long, default_value_t = 3)]
    pub max_tries: u32,
    /// Length of one backoff unit in seconds
    #[arg(long, default_value_t = 60)]
    pub retry_unit_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventsMode {
    /// Emit events as log lines
    Tracing,
    /// Emit events as JSON lines on stdout
    Stdout,
    None,
}
