//! Error types for the session and admission layer.

use tableforge_protocol::{ApiError, UserId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed — the credential was invalid, expired, or
    /// rejected by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for the given user.
    #[error("session not found for user {0}")]
    NotFound(UserId),

    /// The reconnection token doesn't match what the server issued.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The session's reconnection grace period has elapsed, or the user
    /// exceeded `max_reconnect_attempts`.
    #[error("session evicted for user {0}")]
    Evicted(UserId),

    /// The user already has an active (Connected) session.
    #[error("user {0} already has an active session")]
    AlreadyConnected(UserId),

    /// The admission-level request rate limit was exceeded.
    #[error("rate limit exceeded for {0}")]
    RateLimited(String),
}

impl From<&SessionError> for ApiError {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::AuthFailed(_) => ApiError::Unauthenticated,
            SessionError::NotFound(_) => ApiError::NotFound,
            SessionError::InvalidToken => ApiError::Unauthenticated,
            SessionError::Evicted(_) => ApiError::FailedPrecondition,
            SessionError::AlreadyConnected(_) => ApiError::Conflict,
            SessionError::RateLimited(_) => ApiError::ResourceExhausted,
        }
    }
}
