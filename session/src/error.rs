//! Session error types.

use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The source's schema did not form a valid registry.
    #[error("schema error: {0}")]
    Registry(#[from] quarry_registry::RegistryError),

    /// Query error.
    #[error("query error: {0}")]
    Query(#[from] quarry_query::QueryError),

    /// The request could not be decoded.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl SessionError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::invalid_request(err.to_string())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
