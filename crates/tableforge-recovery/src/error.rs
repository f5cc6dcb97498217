//! Error types for the error recovery component itself (as opposed to the
//! errors it classifies and recovers from).

use tableforge_protocol::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("no snapshot available to roll back to")]
    NoSnapshotAvailable,

    #[error("recovery attempts exhausted for this interaction")]
    Unrecoverable,
}

impl From<&RecoveryError> for ApiError {
    fn from(err: &RecoveryError) -> Self {
        match err {
            RecoveryError::NoSnapshotAvailable => ApiError::FailedPrecondition,
            RecoveryError::Unrecoverable => ApiError::Internal,
        }
    }
}
