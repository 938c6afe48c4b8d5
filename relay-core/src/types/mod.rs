mod connection;
mod connector;
mod document;

pub use connection::{ConnectionSpec, ConnectorRef, RefSection};
pub use connector::ConnectorConfig;
pub use document::{ConnectionsDocument, ResolvedConnection};
