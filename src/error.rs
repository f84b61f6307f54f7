use serde::Serialize;
use thiserror::Error;

/// Failure raised by a single backend call.
///
/// Every variant is caught at the per-backend boundary inside the aggregator
/// and turned into a failed envelope; none of them escape `aggregate()`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A required config field is missing. Raised before any network I/O.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The backend rejected the credentials (HTTP 401/403).
    #[error("authentication rejected: {0}")]
    Authentication(String),
    /// The request never reached the server (DNS, refused connection, TLS).
    #[error("connectivity error: {0}")]
    Connectivity(String),
    /// The backend answered, but not with a usable response.
    #[error("protocol error{}: {message}", fmt_status(.status))]
    Protocol {
        status: Option<u16>,
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Parse(String),
    /// No response within the adapter's deadline.
    #[error("timed out: {0}")]
    Timeout(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

/// Closed error classification carried by failed envelopes and probe reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Connectivity,
    Protocol,
    Parse,
    Timeout,
}

/// Serializable failure carried by failed envelopes and probe reports.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<SourceError> for SourceFailure {
    fn from(err: SourceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Classify a non-2xx response status. 401/403 mean the server was
    /// reached but rejected the credentials; everything else is a protocol
    /// failure carrying the status code.
    pub fn from_status(status: reqwest::StatusCode, backend: &str) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            Self::Authentication(format!(
                "{} rejected the configured credentials (HTTP {})",
                backend,
                status.as_u16()
            ))
        } else {
            Self::Protocol {
                status: Some(status.as_u16()),
                message: format!("{} returned HTTP {}", backend, status.as_u16()),
            }
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connectivity(format!("could not reach the server: {}", err))
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
