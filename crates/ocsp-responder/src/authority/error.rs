//! Error types for authority backend reads

use thiserror::Error;

/// Errors returned by an [`AuthorityClient`](super::AuthorityClient)
#[derive(Error, Debug)]
pub enum AuthorityError {
    /// Request never produced an HTTP response (connect failure, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("Unexpected status {status} from {path}")]
    UnexpectedStatus { path: String, status: u16 },

    /// Response body could not be decoded
    #[error("Invalid response from {path}: {message}")]
    InvalidResponse { path: String, message: String },

    /// Revocation record fields have the wrong shape
    #[error("Malformed revocation record: {0}")]
    MalformedRecord(String),

    /// No CA certificate exists for the mount
    #[error("Mount not found: {0}")]
    MountNotFound(String),

    /// Backend configuration rejected at construction time
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AuthorityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthorityError::Transport(format!("request timed out: {}", err))
        } else {
            AuthorityError::Transport(err.to_string())
        }
    }
}

/// Result type for authority operations
pub type AuthorityResult<T> = Result<T, AuthorityError>;
