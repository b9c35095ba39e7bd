use std::fmt;
use std::path::PathBuf;

/// Error type for reference API operations.
#[derive(Debug)]
pub enum ApiError {
    /// No usable credentials at the resolved secrets location
    Secrets { path: Option<PathBuf>, message: String },
    /// Network / transport error
    Http(String),
    /// Non-2xx response
    Status { status: u16, body: String },
    /// Response body is not the expected JSON shape
    Decode(String),
    /// Recorded response file missing or malformed
    Fixture { path: PathBuf, message: String },
    /// Call name is not one of the known record types
    UnknownCall(String),
    /// A call was made without a parameter it needs
    MissingParam { call: String, param: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secrets { path: Some(path), message } => {
                write!(f, "secrets {}: {message}", path.display())
            }
            Self::Secrets { path: None, message } => write!(f, "secrets: {message}"),
            Self::Http(msg) => write!(f, "network error: {msg}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Decode(msg) => write!(f, "unexpected response: {msg}"),
            Self::Fixture { path, message } => write!(f, "fixture {}: {message}", path.display()),
            Self::UnknownCall(name) => write!(
                f,
                "unknown API call '{name}' (expected scopes, portfolios, holdings or transactions)"
            ),
            Self::MissingParam { call, param } => write!(f, "{call}: missing required parameter '{param}'"),
        }
    }
}

impl std::error::Error for ApiError {}
