#![forbid(unsafe_code)]

//! Batch delivery engine for relay connections.
//!
//! A connection pulls records from a [`Source`] in batches sized by its
//! [`Destination`], sends them, accounts for every record individually, and
//! persists whatever failed in a retriable way as the next retry generation.

pub mod connector;
pub mod connectors;
pub mod delivery;
pub mod executor;
pub mod registry;
pub mod replay;
pub mod resolver;
pub mod retry;

pub use crate::connector::{
    Destination, PartialFailureIndexMap, ReplayLineage, SendError, Source, SourceError,
};
pub use crate::executor::{ConnectionOutcome, ExecutionError, Executor, ExecutorConfig, RetryPoller};
pub use crate::registry::{
    DestinationKind, RegisteredConnection, Registration, Registry, SourceKind,
};
pub use crate::replay::ReplaySource;
pub use crate::resolver::{partial_failure_index_map, resolve, BatchOutcome};
pub use crate::retry::{RetryConfig, RetryOutcome};
