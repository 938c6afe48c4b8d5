#![forbid(unsafe_code)]

//! Record model, run accounting, and the connections document for relay.

pub mod error;
pub mod parser;
pub mod record;
pub mod result;
pub mod schema;
pub mod types;
pub mod validate;

pub use crate::error::{ConfigError, ParseError, RelayError, ValidationError, Violation};
pub use crate::parser::{parse_document_str, DocumentFormat, ParsedDocument};
pub use crate::record::Record;
pub use crate::result::{RunResult, RunSummary, ValidationResult};
pub use crate::schema::{FieldType, ProtocolSchema, SchemaField};
pub use crate::types::{
    ConnectionSpec, ConnectionsDocument, ConnectorConfig, ConnectorRef, RefSection,
    ResolvedConnection,
};
pub use crate::validate::{validate_document, Validate};
