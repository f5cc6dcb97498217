//! Error types for the protocol layer.
//!
//! Each crate in this workspace defines its own error enum. This keeps
//! errors specific and meaningful — when you see a `ProtocolError`, you
//! know the problem is in serialization/deserialization, not in networking
//! or room management.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, wrong data
    /// types, or truncated messages.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level — it deserialized fine
    /// but violates a protocol rule (e.g. a handshake with version 0).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Cross-cutting error taxonomy surfaced on every external operation.
///
/// Every internal error enum in this workspace (`RoomError`, `SessionError`,
/// `EngineError`, `PersistenceError`, `ChatError`, `RecoveryError`, ...)
/// converts into one of these kinds rather than leaking its own variants
/// across a component boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("failed precondition")]
    FailedPrecondition,
    #[error("resource exhausted")]
    ResourceExhausted,
    #[error("unavailable")]
    Unavailable,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    /// A stable, machine-readable code for this error kind, suitable for
    /// the `code` field of an `ERROR` event or an HTTP-style response body.
    pub fn code(self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Conflict => "CONFLICT",
            ApiError::InvalidArgument => "INVALID_ARGUMENT",
            ApiError::FailedPrecondition => "FAILED_PRECONDITION",
            ApiError::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ApiError::Unavailable => "UNAVAILABLE",
            ApiError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ApiError::Internal => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod api_error_tests {
    use super::*;

    #[test]
    fn test_code_matches_expected_stable_strings() {
        assert_eq!(ApiError::NotFound.code(), "NOT_FOUND");
        assert_eq!(ApiError::ResourceExhausted.code(), "RESOURCE_EXHAUSTED");
        assert_eq!(ApiError::Internal.code(), "INTERNAL");
    }
}
