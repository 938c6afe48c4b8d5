use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::types::{ConnectionSpec, ConnectorConfig, ConnectorRef, RefSection};

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConnectionsDocument {
    #[serde(default)]
    pub sources: BTreeMap<String, ConnectorConfig>,

    #[serde(default)]
    pub destinations: BTreeMap<String, ConnectorConfig>,

    #[serde(default, alias = "activations")]
    pub connections: Vec<ConnectionSpec>,
}

/// A connection with its `$ref`s replaced by the referenced connector entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConnection {
    pub name: String,
    pub schedule: Option<String>,
    pub source: ConnectorConfig,
    pub destination: ConnectorConfig,
    pub credentials: Option<serde_json::Value>,
}

impl ConnectionsDocument {
    pub fn connection(&self, name: &str) -> Option<&ConnectionSpec> {
        self.connections.iter().find(|c| c.name == name)
    }

    pub fn resolve(&self, spec: &ConnectionSpec) -> Result<ResolvedConnection, ConfigError> {
        Ok(ResolvedConnection {
            name: spec.name.clone(),
            schedule: spec.schedule.clone(),
            source: self.lookup(&spec.source, RefSection::Sources)?.clone(),
            destination: self.lookup(&spec.destination, RefSection::Destinations)?.clone(),
            credentials: spec.credentials.clone(),
        })
    }

    pub(crate) fn lookup(
        &self,
        r: &ConnectorRef,
        expected: RefSection,
    ) -> Result<&ConnectorConfig, ConfigError> {
        let (section, name) = r.parse()?;
        if section != expected {
            return Err(ConfigError::WrongSection {
                reference: r.reference.clone(),
                expected: match expected {
                    RefSection::Sources => "source",
                    RefSection::Destinations => "destination",
                },
                found: section.as_str().to_string(),
            });
        }
        let table = match section {
            RefSection::Sources => &self.sources,
            RefSection::Destinations => &self.destinations,
        };
        table
            .get(name)
            .ok_or_else(|| ConfigError::UnresolvedRef(r.reference.clone()))
    }
}
