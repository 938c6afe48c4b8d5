mod migrate;
mod retries;
mod store;

pub use migrate::run_migrations;
pub use store::PostgresStore;
