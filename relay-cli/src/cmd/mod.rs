pub mod config;
pub mod connectors;
pub mod list_retries;
pub mod migrate;
pub mod retries;
pub mod run;
pub mod validate;
