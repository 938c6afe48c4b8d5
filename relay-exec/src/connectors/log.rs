use async_trait::async_trait;
use relay_core::{ConfigError, ConnectorConfig, FieldType, ProtocolSchema, Record, ValidationResult};

use crate::connector::{Destination, PartialFailureIndexMap, SendError};

pub const LOG_KIND: &str = "log";

const DEFAULT_BATCH_SIZE: usize = 100;

/// Writes every group to the log and reports all of it delivered.
#[derive(Debug, Clone)]
pub struct LogDestination {
    fields: Vec<String>,
    required: Vec<String>,
    partition_key: Option<String>,
    batch_size: usize,
}

impl Default for LogDestination {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            required: Vec::new(),
            partition_key: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl LogDestination {
    pub fn from_config(cfg: &ConnectorConfig) -> Result<Self, ConfigError> {
        let batch_size = match cfg.u64_setting("batch_size")? {
            Some(n) => usize::try_from(n)
                .map_err(|_| ConfigError::invalid_field("batch_size", "out of range"))?,
            None => DEFAULT_BATCH_SIZE,
        };
        Ok(Self {
            fields: string_list(cfg, "fields")?,
            required: string_list(cfg, "required_fields")?,
            partition_key: cfg.str_setting("partition_key")?,
            batch_size,
        })
    }

    pub fn protocol_schema() -> ProtocolSchema {
        ProtocolSchema::new(LOG_KIND)
            .optional("fields", FieldType::String, "fields to pull; empty pulls every field")
            .optional("required_fields", FieldType::String, "fields every record must carry")
            .optional("partition_key", FieldType::String, "field to group records by")
            .optional("batch_size", FieldType::Integer, "records per pull (default 100)")
    }
}

fn string_list(cfg: &ConnectorConfig, key: &str) -> Result<Vec<String>, ConfigError> {
    match cfg.get(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigError::invalid_field(key, "expected a list of strings"))
            })
            .collect(),
        Some(serde_json::Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Some(_) => Err(ConfigError::invalid_field(key, "expected a list of strings")),
    }
}

#[async_trait]
impl Destination for LogDestination {
    fn kind(&self) -> &str {
        LOG_KIND
    }

    fn fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn required_fields(&self) -> Vec<String> {
        self.required.clone()
    }

    fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn validate(&self) -> ValidationResult {
        let mut messages = Vec::new();
        if self.batch_size == 0 {
            messages.push("batch_size must be positive".to_string());
        }
        for f in &self.required {
            if !self.fields.contains(f) {
                messages.push(format!("required field `{f}` is not in fields"));
            }
        }
        if messages.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(messages)
        }
    }

    fn schema(&self) -> ProtocolSchema {
        Self::protocol_schema()
    }

    async fn send_group(
        &self,
        key: Option<&str>,
        records: &[Record],
    ) -> Result<PartialFailureIndexMap, SendError> {
        for record in records {
            tracing::info!(
                partition = key.unwrap_or("-"),
                record = %serde_json::to_string(record).unwrap_or_default(),
                "log destination"
            );
        }
        Ok(PartialFailureIndexMap::new())
    }
}
