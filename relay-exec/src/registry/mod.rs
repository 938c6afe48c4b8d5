//! Turns connections document entries into runnable connectors.
//!
//! Connector types form a closed set; an unknown `type` is rejected when the
//! connection is registered, not when it first runs.

mod kinds;

use std::sync::Arc;

use relay_core::{
    ConfigError, ConnectionSpec, ConnectionsDocument, ConnectorConfig, ProtocolSchema,
    ValidationResult,
};
use serde_json::Value as JsonValue;

use crate::connector::{Destination, Source};
use crate::connectors::{ConversionUploadDestination, InlineSource, JsonFileSource, LogDestination};
use crate::executor::HttpClient;
use crate::replay::ReplaySource;

pub use kinds::{DestinationKind, SourceKind};

/// A connection ready to run.
#[derive(Clone)]
pub struct RegisteredConnection {
    pub name: String,
    pub schedule: Option<String>,
    pub source: Arc<dyn Source>,
    pub destination: Arc<dyn Destination>,
    /// Kept so a retry can rebuild the destination later.
    pub destination_config: ConnectorConfig,
    pub credentials: Option<JsonValue>,
}

impl std::fmt::Debug for RegisteredConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredConnection")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("source", &self.source.kind())
            .field("destination", &self.destination.kind())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub connection: String,
    pub error: ConfigError,
}

/// Result of registering every connection of a document. One connection
/// failing never prevents the others from registering.
#[derive(Debug, Default)]
pub struct Registration {
    pub connections: Vec<RegisteredConnection>,
    pub errors: Vec<ConnectionError>,
}

impl Registration {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectorInfo {
    pub role: &'static str,
    pub kind: &'static str,
    pub schema: ProtocolSchema,
}

pub struct Registry {
    http: Arc<dyn HttpClient>,
}

impl Registry {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    pub fn build_source(&self, cfg: &ConnectorConfig) -> Result<Arc<dyn Source>, ConfigError> {
        let kind: SourceKind = cfg.type_name()?.parse()?;
        let source: Arc<dyn Source> = match kind {
            SourceKind::Inline => Arc::new(InlineSource::from_config(cfg)?),
            SourceKind::JsonFile => Arc::new(JsonFileSource::from_config(cfg)?),
            SourceKind::Replay => {
                return Err(ConfigError::invalid_field(
                    "type",
                    "replay sources are created from persisted retries",
                ))
            }
        };
        check("source", source.validate())?;
        Ok(source)
    }

    pub fn build_destination(&self, cfg: &ConnectorConfig) -> Result<Arc<dyn Destination>, ConfigError> {
        let kind: DestinationKind = cfg.type_name()?.parse()?;
        let destination: Arc<dyn Destination> = match kind {
            DestinationKind::ConversionUpload => Arc::new(ConversionUploadDestination::from_config(
                cfg,
                Arc::clone(&self.http),
            )?),
            DestinationKind::Log => Arc::new(LogDestination::from_config(cfg)?),
        };
        check("destination", destination.validate())?;
        Ok(destination)
    }

    pub fn register(
        &self,
        doc: &ConnectionsDocument,
        spec: &ConnectionSpec,
    ) -> Result<RegisteredConnection, ConfigError> {
        let resolved = doc.resolve(spec)?;
        let source = self.build_source(&resolved.source)?;
        let destination = self.build_destination(&resolved.destination)?;
        Ok(RegisteredConnection {
            name: resolved.name,
            schedule: resolved.schedule,
            source,
            destination,
            destination_config: resolved.destination,
            credentials: resolved.credentials,
        })
    }

    pub fn register_connections(&self, doc: &ConnectionsDocument) -> Registration {
        let mut registration = Registration::default();
        for spec in &doc.connections {
            match self.register(doc, spec) {
                Ok(conn) => {
                    tracing::debug!(
                        connection = %conn.name,
                        source = conn.source.kind(),
                        destination = conn.destination.kind(),
                        "connection registered"
                    );
                    registration.connections.push(conn);
                }
                Err(error) => {
                    tracing::warn!(connection = %spec.name, error = %error, "connection not registered");
                    registration.errors.push(ConnectionError {
                        connection: spec.name.clone(),
                        error,
                    });
                }
            }
        }
        registration
    }

    /// Every supported connector type with its configuration schema.
    pub fn connectors() -> Vec<ConnectorInfo> {
        let sources = SourceKind::ALL.into_iter().map(|kind| ConnectorInfo {
            role: "source",
            kind: kind.as_str(),
            schema: match kind {
                SourceKind::Inline => InlineSource::protocol_schema(),
                SourceKind::JsonFile => JsonFileSource::protocol_schema(),
                SourceKind::Replay => ReplaySource::protocol_schema(),
            },
        });
        let destinations = DestinationKind::ALL.into_iter().map(|kind| ConnectorInfo {
            role: "destination",
            kind: kind.as_str(),
            schema: match kind {
                DestinationKind::ConversionUpload => ConversionUploadDestination::protocol_schema(),
                DestinationKind::Log => LogDestination::protocol_schema(),
            },
        });
        sources.chain(destinations).collect()
    }
}

fn check(role: &'static str, v: ValidationResult) -> Result<(), ConfigError> {
    if v.is_valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            role,
            messages: v.messages,
        })
    }
}
