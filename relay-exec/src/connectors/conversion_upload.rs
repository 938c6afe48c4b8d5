use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use relay_core::{ConfigError, ConnectorConfig, FieldType, ProtocolSchema, Record, ValidationResult};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::connector::{Destination, PartialFailureIndexMap, SendError};
use crate::executor::{HttpClient, HttpRequestParts};
use crate::resolver::partial_failure_index_map;

pub const CONVERSION_UPLOAD_KIND: &str = "conversion_upload";

pub const BATCH_SIZE: usize = 2000;

const DEFAULT_ENDPOINT: &str = "https://googleads.googleapis.com/v17";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const REQUIRED_FIELDS: [&str; 4] = [
    "customer_id",
    "conversion_action_id",
    "conversion_date_time",
    "conversion_value",
];
const IDENTIFIER_FIELDS: [&str; 4] = ["email", "phone_number", "hashed_email", "hashed_phone_number"];
const OPTIONAL_FIELDS: [&str; 4] = [
    "order_id",
    "currency_code",
    "conversion_custom_variable_id",
    "conversion_custom_variable_value",
];

const CREDENTIAL_KEYS: [&str; 5] = [
    "client_id",
    "client_secret",
    "developer_token",
    "login_customer_id",
    "refresh_token",
];

struct CachedToken {
    value: SecretString,
    expires_at: Instant,
}

/// Offline click-conversion upload to an ads API, one call per customer.
///
/// Calls are made with partial failure enabled, so a response can reject some
/// conversions of a call while accepting the rest.
pub struct ConversionUploadDestination {
    endpoint: Option<String>,
    token_uri: String,
    timeout: Duration,
    debug: bool,
    credentials: BTreeMap<&'static str, SecretString>,
    http: Arc<dyn HttpClient>,
    token: Mutex<Option<CachedToken>>,
}

impl ConversionUploadDestination {
    pub fn from_config(cfg: &ConnectorConfig, http: Arc<dyn HttpClient>) -> Result<Self, ConfigError> {
        let mut credentials = BTreeMap::new();
        for key in CREDENTIAL_KEYS {
            if let Some(value) = cfg.str_setting(key)? {
                credentials.insert(key, SecretString::from(value));
            }
        }
        Ok(Self {
            endpoint: cfg.str_setting("endpoint")?.or_else(|| Some(DEFAULT_ENDPOINT.to_string())),
            token_uri: cfg
                .str_setting("token_uri")?
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            timeout: Duration::from_secs(cfg.u64_setting("timeout_secs")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            debug: cfg.bool_setting("debug")?.unwrap_or(false),
            credentials,
            http,
            token: Mutex::new(None),
        })
    }

    pub fn protocol_schema() -> ProtocolSchema {
        let mut schema = ProtocolSchema::new(CONVERSION_UPLOAD_KIND)
            .optional("endpoint", FieldType::String, "API base URL including version")
            .optional("token_uri", FieldType::String, "OAuth token endpoint")
            .optional("timeout_secs", FieldType::Integer, "per-request timeout (default 30)")
            .optional(
                "debug",
                FieldType::Boolean,
                "run all upload checks and report errors without recording conversions",
            );
        for key in CREDENTIAL_KEYS {
            schema = schema.required(key, FieldType::String, "API credential");
        }
        schema
    }

    fn secret(&self, key: &str) -> Result<&str, SendError> {
        self.credentials
            .get(key)
            .map(|s| s.expose_secret())
            .ok_or_else(|| SendError::Auth(format!("missing credential `{key}`")))
    }

    fn base_url(&self) -> Result<&str, SendError> {
        self.endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .ok_or_else(|| SendError::Encode("endpoint is not configured".to_string()))
    }

    async fn access_token(&self) -> Result<String, SendError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.expose_secret().to_string());
            }
        }

        let body = format!(
            "grant_type=refresh_token&client_id={}&client_secret={}&refresh_token={}",
            urlencoding::encode(self.secret("client_id")?),
            urlencoding::encode(self.secret("client_secret")?),
            urlencoding::encode(self.secret("refresh_token")?),
        );
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        let req = HttpRequestParts {
            method: "POST".to_string(),
            url: parse_url(&self.token_uri)?,
            headers,
            body: body.into_bytes(),
        };

        let resp = self.http.send(req, self.timeout, MAX_RESPONSE_BYTES).await?;
        if !resp.is_success() {
            return Err(SendError::Auth(format!("token endpoint returned {}", resp.status)));
        }
        let parsed: JsonValue =
            serde_json::from_slice(&resp.body).map_err(|e| SendError::Auth(e.to_string()))?;
        let access = parsed
            .get("access_token")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| SendError::Auth("token response without access_token".to_string()))?
            .to_string();
        let lifetime = Duration::from_secs(parsed.get("expires_in").and_then(JsonValue::as_u64).unwrap_or(0));

        *cached = Some(CachedToken {
            value: SecretString::from(access.clone()),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(access)
    }
}

fn parse_url(raw: &str) -> Result<url::Url, SendError> {
    url::Url::parse(raw).map_err(|e| SendError::Encode(format!("invalid url `{raw}`: {e}")))
}

/// Customer ids are accepted with or without dashes.
fn normalize_customer_id(raw: &str) -> String {
    raw.chars().filter(|c| *c != '-').collect()
}

fn conversion_payload(customer_id: &str, record: &Record) -> JsonValue {
    let mut conversion = serde_json::Map::new();
    conversion.insert(
        "conversionAction".to_string(),
        json!(format!(
            "customers/{customer_id}/conversionActions/{}",
            record.get_str("conversion_action_id").unwrap_or_default()
        )),
    );
    conversion.insert(
        "conversionDateTime".to_string(),
        json!(record.get_str("conversion_date_time")),
    );
    let value = match record.get("conversion_value") {
        Some(JsonValue::Number(n)) => json!(n),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().map(|v| json!(v)).unwrap_or(json!(s)),
        other => json!(other),
    };
    conversion.insert("conversionValue".to_string(), value);
    conversion.insert(
        "currencyCode".to_string(),
        json!(first_present(record, &["currency_code"]).unwrap_or_else(|| "USD".to_string())),
    );
    if let Some(order_id) = first_present(record, &["order_id"]) {
        conversion.insert("orderId".to_string(), json!(order_id));
    }

    let mut identifiers = Vec::new();
    let email = first_present(record, &["hashed_email"])
        .or_else(|| first_present(record, &["email"]).map(|e| hash_email(&e)));
    if let Some(email) = email {
        identifiers.push(json!({ "hashedEmail": email }));
    }
    let phone = first_present(record, &["hashed_phone_number"])
        .or_else(|| first_present(record, &["phone_number"]).map(|p| hash_normalized(&p)));
    if let Some(phone) = phone {
        identifiers.push(json!({ "hashedPhoneNumber": phone }));
    }
    if !identifiers.is_empty() {
        conversion.insert("userIdentifiers".to_string(), JsonValue::Array(identifiers));
    }

    if let (Some(var_id), Some(var_value)) = (
        first_present(record, &["conversion_custom_variable_id"]),
        first_present(record, &["conversion_custom_variable_value"]),
    ) {
        conversion.insert(
            "customVariables".to_string(),
            json!([{
                "conversionCustomVariable":
                    format!("customers/{customer_id}/conversionCustomVariables/{var_id}"),
                "value": var_value,
            }]),
        );
    }

    JsonValue::Object(conversion)
}

/// Hex SHA-256 of the trimmed, lowercased value.
fn hash_normalized(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Like [`hash_normalized`], but dots are dropped from the local part of
/// gmail.com and googlemail.com addresses first.
fn hash_email(email: &str) -> String {
    let lowered = email.trim().to_lowercase();
    let normalized = match lowered.split_once('@') {
        Some((local, domain)) if matches!(domain, "gmail.com" | "googlemail.com") => {
            format!("{}@{domain}", local.replace('.', ""))
        }
        _ => lowered,
    };
    hash_normalized(&normalized)
}

fn first_present(record: &Record, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find(|f| record.is_present(f))
        .and_then(|f| record.get_str(f))
}

#[async_trait]
impl Destination for ConversionUploadDestination {
    fn kind(&self) -> &str {
        CONVERSION_UPLOAD_KIND
    }

    fn fields(&self) -> Vec<String> {
        REQUIRED_FIELDS
            .iter()
            .chain(IDENTIFIER_FIELDS.iter())
            .chain(OPTIONAL_FIELDS.iter())
            .map(|f| f.to_string())
            .collect()
    }

    fn required_fields(&self) -> Vec<String> {
        REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect()
    }

    fn partition_key(&self) -> Option<&str> {
        Some("customer_id")
    }

    fn batch_size(&self) -> usize {
        BATCH_SIZE
    }

    fn validate(&self) -> ValidationResult {
        let mut messages = Vec::new();
        match self.endpoint.as_deref().map(url::Url::parse) {
            Some(Ok(u)) if matches!(u.scheme(), "http" | "https") => {}
            Some(Ok(u)) => messages.push(format!("endpoint scheme `{}` is not http(s)", u.scheme())),
            Some(Err(e)) => messages.push(format!("endpoint is not a valid URL: {e}")),
            None => messages.push("endpoint is required".to_string()),
        }
        if let Err(e) = url::Url::parse(&self.token_uri) {
            messages.push(format!("token_uri is not a valid URL: {e}"));
        }
        for key in CREDENTIAL_KEYS {
            if !self.credentials.contains_key(key) {
                messages.push(format!("missing credential `{key}`"));
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
        let raw_customer = key
            .map(str::to_string)
            .or_else(|| records.first().and_then(|r| r.get_str("customer_id")))
            .ok_or_else(|| SendError::Encode("no customer_id for group".to_string()))?;
        let customer_id = normalize_customer_id(&raw_customer);

        let conversions: Vec<JsonValue> = records
            .iter()
            .map(|r| conversion_payload(&customer_id, r))
            .collect();
        let body = serde_json::to_vec(&json!({
            "conversions": conversions,
            "partialFailure": true,
            "debugEnabled": self.debug,
        }))
        .map_err(|e| SendError::Encode(e.to_string()))?;

        let url = parse_url(&format!(
            "{}/customers/{}:uploadClickConversions",
            self.base_url()?,
            urlencoding::encode(&customer_id)
        ))?;

        let token = self.access_token().await?;
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), format!("Bearer {token}"));
        headers.insert("developer-token".to_string(), self.secret("developer_token")?.to_string());
        headers.insert(
            "login-customer-id".to_string(),
            normalize_customer_id(self.secret("login_customer_id")?),
        );
        headers.insert("content-type".to_string(), "application/json".to_string());

        tracing::debug!(customer_id = %customer_id, conversions = records.len(), "uploading conversions");
        let resp = self
            .http
            .send(
                HttpRequestParts {
                    method: "POST".to_string(),
                    url,
                    headers,
                    body,
                },
                self.timeout,
                MAX_RESPONSE_BYTES,
            )
            .await?;

        if !resp.is_success() {
            return Err(SendError::HttpStatus {
                status: resp.status,
                body: resp.body_text().chars().take(512).collect(),
            });
        }

        if resp.body.is_empty() {
            return Ok(PartialFailureIndexMap::new());
        }
        let parsed: JsonValue =
            serde_json::from_slice(&resp.body).map_err(|e| SendError::Decode(e.to_string()))?;
        Ok(partial_failure_index_map(&parsed))
    }
}
