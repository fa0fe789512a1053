//! Error types for the Food Zone license service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("License has expired")]
    Expired,

    #[error("{message}")]
    Conflict {
        message: String,
        hint: Option<String>,
    },

    #[error("License key already exists: {0}")]
    DuplicateKey(String),

    #[error("Unauthorized")]
    Unauthorized,

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the caller can fix the request and try again.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::NotFound(_)
                | Error::Expired
                | Error::Conflict { .. }
                | Error::DuplicateKey(_)
        )
    }

    /// Optional follow-up advice for the end user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Error::Conflict { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
