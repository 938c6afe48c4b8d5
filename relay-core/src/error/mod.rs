use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
#[error("connections document failed validation ({violations_len} violations)")]
pub struct ValidationError {
    pub violations: Vec<Violation>,
    violations_len: usize,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        let violations_len = violations.len();
        Self {
            violations,
            violations_len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while turning configuration into runnable connectors.
///
/// These abort the setup of one connection only; callers collect them per
/// connection and keep registering the rest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid reference `{0}` (expected #/sources/<name> or #/destinations/<name>)")]
    InvalidRef(String),
    #[error("unresolved reference `{0}`")]
    UnresolvedRef(String),
    #[error("reference `{reference}` points into `{found}` but a {expected} is required")]
    WrongSection {
        reference: String,
        expected: &'static str,
        found: String,
    },
    #[error("missing config attribute `type`")]
    MissingType,
    #[error("unknown {role} type `{name}`")]
    UnknownConnector { role: &'static str, name: String },
    #[error("invalid value for `{field}`: {message}")]
    InvalidField { field: String, message: String },
    #[error("invalid {role} config: {}", messages.join("; "))]
    Invalid {
        role: &'static str,
        messages: Vec<String>,
    },
}

impl ConfigError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
