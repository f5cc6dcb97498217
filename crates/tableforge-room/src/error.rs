//! Error types for the room layer.

use tableforge_protocol::{ApiError, InteractionId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("interaction {0} not found")]
    NotFound(InteractionId),

    #[error("user {0} is already a participant")]
    AlreadyJoined(UserId),

    #[error("user {0} is not a participant")]
    NotParticipant(UserId),

    #[error("action rejected: {0}")]
    ActionRejected(String),

    #[error("invalid state transition for this operation")]
    InvalidTransition,

    #[error("only the DM may perform this operation")]
    DmOnly,

    #[error("no snapshot available to roll back to")]
    NoSnapshotAvailable,

    #[error("the room's command channel is unavailable")]
    Unavailable,
}

impl From<&RoomError> for ApiError {
    fn from(err: &RoomError) -> Self {
        match err {
            RoomError::NotFound(_) => ApiError::NotFound,
            RoomError::AlreadyJoined(_) => ApiError::Conflict,
            RoomError::NotParticipant(_) => ApiError::Forbidden,
            RoomError::ActionRejected(_) => ApiError::InvalidArgument,
            RoomError::InvalidTransition => ApiError::FailedPrecondition,
            RoomError::DmOnly => ApiError::Forbidden,
            RoomError::NoSnapshotAvailable => ApiError::FailedPrecondition,
            RoomError::Unavailable => ApiError::Unavailable,
        }
    }
}

impl From<tableforge_protocol::ValidationResult> for RoomError {
    fn from(result: tableforge_protocol::ValidationResult) -> Self {
        RoomError::ActionRejected(result.errors.join("; "))
    }
}
