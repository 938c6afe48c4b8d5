use crate::executor::HttpError;

/// A send call that failed as a whole. Every record submitted in the call is
/// counted failed with this error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<HttpError> for SendError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout => SendError::Timeout,
            HttpError::Network(m) => SendError::Network(m),
            other => SendError::Network(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("malformed record at {location}: {message}")]
    Malformed { location: String, message: String },
    #[error("retry payload unavailable: {0}")]
    Replay(String),
    #[error("source error: {0}")]
    Other(String),
}
