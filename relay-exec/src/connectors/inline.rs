use async_trait::async_trait;
use relay_core::{ConfigError, ConnectorConfig, FieldType, ProtocolSchema, Record, ValidationResult};
use serde_json::Value as JsonValue;

use crate::connector::{Source, SourceError};

pub const INLINE_KIND: &str = "inline";

/// Records written directly into the connections document under `records`.
#[derive(Debug, Clone, Default)]
pub struct InlineSource {
    records: Vec<Record>,
}

impl InlineSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_config(cfg: &ConnectorConfig) -> Result<Self, ConfigError> {
        let records = match cfg.get("records") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    Record::try_from(item.clone()).map_err(|_| {
                        ConfigError::invalid_field(format!("records[{i}]"), "expected an object")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ConfigError::invalid_field("records", "expected an array")),
        };
        Ok(Self { records })
    }

    pub fn protocol_schema() -> ProtocolSchema {
        ProtocolSchema::new(INLINE_KIND).optional(
            "records",
            FieldType::Records,
            "records served in order, projected onto the destination's fields",
        )
    }
}

#[async_trait]
impl Source for InlineSource {
    fn kind(&self) -> &str {
        INLINE_KIND
    }

    async fn get_data(
        &self,
        fields: &[String],
        offset: usize,
        limit: usize,
        _credentials: Option<&JsonValue>,
    ) -> Result<Vec<Record>, SourceError> {
        Ok(self
            .records
            .iter()
            .skip(offset)
            .take(limit)
            .map(|r| super::select(r, fields))
            .collect())
    }

    fn schema(&self) -> ProtocolSchema {
        Self::protocol_schema()
    }

    fn validate(&self) -> ValidationResult {
        ValidationResult::valid()
    }
}
