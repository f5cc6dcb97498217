//! Unified error type for the live interaction server.

use tableforge_chat::ChatError;
use tableforge_config::ConfigError;
use tableforge_persistence::PersistenceError;
use tableforge_protocol::{ApiError, ProtocolError};
use tableforge_room::RoomError;
use tableforge_session::SessionError;
use tableforge_transport::TransportError;

/// Top-level error that wraps every sub-crate's error type.
///
/// The `#[from]` attribute on each variant auto-generates a `From` impl,
/// so the `?` operator converts sub-crate errors automatically. Handlers
/// convert the final value into a stable `{code, message}` pair via
/// [`ServerError::api_error`] rather than exposing internals to clients.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServerError {
    /// The cross-cutting error kind this error maps to, per the taxonomy
    /// every component's own error converts into.
    pub fn api_error(&self) -> ApiError {
        match self {
            ServerError::Transport(_) => ApiError::Unavailable,
            ServerError::Protocol(_) => ApiError::InvalidArgument,
            ServerError::Session(err) => err.into(),
            ServerError::Room(err) => err.into(),
            ServerError::Chat(err) => err.into(),
            ServerError::Persistence(err) => err.into(),
            ServerError::Config(_) => ApiError::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableforge_protocol::UserId;

    #[test]
    fn test_from_session_error_maps_to_matching_api_error() {
        let err: ServerError = SessionError::NotFound(UserId::new("u1")).into();
        assert!(matches!(err, ServerError::Session(_)));
        assert_eq!(err.api_error(), ApiError::NotFound);
    }

    #[test]
    fn test_from_room_error_maps_to_matching_api_error() {
        let err: ServerError = RoomError::DmOnly.into();
        assert!(matches!(err, ServerError::Room(_)));
        assert_eq!(err.api_error(), ApiError::Forbidden);
    }

    #[test]
    fn test_config_error_maps_to_internal() {
        let err: ServerError = ConfigError::MissingRequired(vec!["PORT".into()]).into();
        assert_eq!(err.api_error(), ApiError::Internal);
    }
}
