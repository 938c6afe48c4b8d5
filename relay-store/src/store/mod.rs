mod trait_store;
mod types;

pub use trait_store::{RetryStore, StoreError};
pub use types::{NewRetry, RetryRecord, RetryStatus};
