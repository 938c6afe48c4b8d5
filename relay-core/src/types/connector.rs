use serde_json::{Map, Value};

use crate::error::ConfigError;

/// A source or destination entry of the connections document.
///
/// `type` selects the connector implementation; every other key is handed to
/// that connector as its settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConnectorConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connector_type: Option<String>,

    #[serde(flatten, default)]
    pub settings: Map<String, Value>,
}

impl ConnectorConfig {
    pub fn new(connector_type: impl Into<String>) -> Self {
        Self {
            connector_type: Some(connector_type.into()),
            settings: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn type_name(&self) -> Result<&str, ConfigError> {
        match self.connector_type.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ConfigError::MissingType),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Optional string setting; empty strings count as unset.
    pub fn str_setting(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(ConfigError::invalid_field(key, "expected a string")),
        }
    }

    pub fn require_str(&self, key: &str) -> Result<String, ConfigError> {
        self.str_setting(key)?
            .ok_or_else(|| ConfigError::invalid_field(key, "is required"))
    }

    pub fn u64_setting(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| ConfigError::invalid_field(key, "expected a non-negative integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|e| ConfigError::invalid_field(key, e.to_string())),
            Some(_) => Err(ConfigError::invalid_field(key, "expected a non-negative integer")),
        }
    }

    pub fn bool_setting(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" | "" => Ok(Some(false)),
                other => Err(ConfigError::invalid_field(key, format!("not a boolean: {other}"))),
            },
            Some(_) => Err(ConfigError::invalid_field(key, "expected a boolean")),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value)
            .map_err(|e| ConfigError::invalid_field("config", e.to_string()))
    }
}
