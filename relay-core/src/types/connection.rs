use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

static REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#/(sources|destinations)/(.+)$").expect("valid"));

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConnectionSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    pub source: ConnectorRef,

    pub destination: ConnectorRef,

    /// Opaque credentials handed to the source on every pull.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConnectorRef {
    #[serde(rename = "$ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSection {
    Sources,
    Destinations,
}

impl RefSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefSection::Sources => "sources",
            RefSection::Destinations => "destinations",
        }
    }
}

impl ConnectorRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    pub fn parse(&self) -> Result<(RefSection, &str), ConfigError> {
        let caps = REF_RE
            .captures(&self.reference)
            .ok_or_else(|| ConfigError::InvalidRef(self.reference.clone()))?;
        let section = match caps.get(1).map(|m| m.as_str()) {
            Some("sources") => RefSection::Sources,
            Some("destinations") => RefSection::Destinations,
            _ => return Err(ConfigError::InvalidRef(self.reference.clone())),
        };
        let name = caps
            .get(2)
            .map(|m| &self.reference[m.start()..m.end()])
            .ok_or_else(|| ConfigError::InvalidRef(self.reference.clone()))?;
        Ok((section, name))
    }
}
