//! Error types for the game state engine.

use tableforge_protocol::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("action rejected: {0}")]
    Rejected(String),

    #[error("entity {0} not found")]
    EntityNotFound(String),

    #[error("interaction is not active")]
    NotActive,
}

impl From<&EngineError> for ApiError {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Rejected(_) => ApiError::InvalidArgument,
            EngineError::EntityNotFound(_) => ApiError::NotFound,
            EngineError::NotActive => ApiError::FailedPrecondition,
        }
    }
}
