//! Error types for the state persistence gateway.

use tableforge_protocol::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("document not found: {0}/{1}")]
    NotFound(String, String),

    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}

impl From<&PersistenceError> for ApiError {
    fn from(err: &PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(..) => ApiError::NotFound,
            PersistenceError::Unavailable(_) => ApiError::Unavailable,
            PersistenceError::Malformed(_) => ApiError::Internal,
        }
    }
}
