use std::path::PathBuf;

use async_trait::async_trait;
use relay_core::{ConfigError, ConnectorConfig, FieldType, ProtocolSchema, Record, ValidationResult};
use serde_json::Value as JsonValue;
use tokio::sync::OnceCell;

use crate::connector::{Source, SourceError};

pub const JSON_FILE_KIND: &str = "json_file";

/// Reads a JSON array file or a newline-delimited JSON file.
///
/// The file is read once, on the first pull, and served from memory afterwards
/// so offsets stay stable for the rest of the run.
#[derive(Debug, Default)]
pub struct JsonFileSource {
    path: Option<PathBuf>,
    records: OnceCell<Vec<Record>>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            records: OnceCell::new(),
        }
    }

    pub fn from_config(cfg: &ConnectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            path: cfg.str_setting("path")?.map(PathBuf::from),
            records: OnceCell::new(),
        })
    }

    pub fn protocol_schema() -> ProtocolSchema {
        ProtocolSchema::new(JSON_FILE_KIND).required(
            "path",
            FieldType::String,
            "JSON array or newline-delimited JSON file of records",
        )
    }

    async fn load(&self) -> Result<&Vec<Record>, SourceError> {
        self.records
            .get_or_try_init(|| async {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| SourceError::Other("path is not configured".to_string()))?;
                let text = tokio::fs::read_to_string(path).await.map_err(|e| SourceError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                let records = parse_records(&text, &path.display().to_string())?;
                tracing::debug!(path = %path.display(), records = records.len(), "loaded json file");
                Ok(records)
            })
            .await
    }
}

fn parse_records(text: &str, path: &str) -> Result<Vec<Record>, SourceError> {
    if text.trim_start().starts_with('[') {
        let items: Vec<JsonValue> = serde_json::from_str(text).map_err(|e| SourceError::Malformed {
            location: path.to_string(),
            message: e.to_string(),
        })?;
        return items
            .into_iter()
            .enumerate()
            .map(|(i, item)| to_record(item, || format!("{path}[{i}]")))
            .collect();
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            let location = || format!("{path}:{}", n + 1);
            let value: JsonValue = serde_json::from_str(line).map_err(|e| SourceError::Malformed {
                location: location(),
                message: e.to_string(),
            })?;
            to_record(value, location)
        })
        .collect()
}

fn to_record(value: JsonValue, location: impl Fn() -> String) -> Result<Record, SourceError> {
    Record::try_from(value).map_err(|_| SourceError::Malformed {
        location: location(),
        message: "expected a JSON object".to_string(),
    })
}

#[async_trait]
impl Source for JsonFileSource {
    fn kind(&self) -> &str {
        JSON_FILE_KIND
    }

    async fn get_data(
        &self,
        fields: &[String],
        offset: usize,
        limit: usize,
        _credentials: Option<&JsonValue>,
    ) -> Result<Vec<Record>, SourceError> {
        let records = self.load().await?;
        Ok(records
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
        match &self.path {
            Some(_) => ValidationResult::valid(),
            None => ValidationResult::invalid(vec!["path is required".to_string()]),
        }
    }
}
