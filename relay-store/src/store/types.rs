use std::str::FromStr;

use chrono::{DateTime, Utc};
use relay_core::Record;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStatus {
    Pending,
    Running,
    Exhausted,
}

impl RetryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryStatus::Pending => "pending",
            RetryStatus::Running => "running",
            RetryStatus::Exhausted => "exhausted",
        }
    }
}

impl FromStr for RetryStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RetryStatus::Pending),
            "running" => Ok(RetryStatus::Running),
            "exhausted" => Ok(RetryStatus::Exhausted),
            other => Err(StoreError::Other(format!("unknown retry status `{other}`"))),
        }
    }
}

/// A retry generation about to be persisted.
#[derive(Debug, Clone)]
pub struct NewRetry {
    pub connection_id: String,
    pub token: Uuid,
    pub run_name: String,
    pub retry_num: i32,
    pub destination_type: String,
    pub destination_config: JsonValue,
    /// Serialized records, stored verbatim.
    pub data: String,
    pub next_run_at: DateTime<Utc>,
}

impl NewRetry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection_id: impl Into<String>,
        token: Uuid,
        run_name: impl Into<String>,
        retry_num: i32,
        destination_type: impl Into<String>,
        destination_config: JsonValue,
        records: &[Record],
        next_run_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let data = serde_json::to_string(records)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            connection_id: connection_id.into(),
            token,
            run_name: run_name.into(),
            retry_num,
            destination_type: destination_type.into(),
            destination_config,
            data,
            next_run_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct RetryRecord {
    pub id: i64,
    pub connection_id: String,
    pub token: Uuid,
    pub run_name: String,
    pub retry_num: i32,
    pub destination_type: String,
    pub destination_config: JsonValue,
    pub data: String,
    pub status: String,
    pub next_run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl RetryRecord {
    pub fn status(&self) -> Result<RetryStatus, StoreError> {
        self.status.parse()
    }

    /// Decode the persisted records in their original order.
    pub fn records(&self) -> Result<Vec<Record>, StoreError> {
        serde_json::from_str(&self.data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
