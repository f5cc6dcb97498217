//! Error types for the chat service.

use tableforge_protocol::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message content must be 1-{max} characters")]
    InvalidLength { max: usize },

    #[error("sender is not a participant in this interaction")]
    SenderNotParticipant,

    #[error("recipient {0} is not a participant in this interaction")]
    RecipientNotParticipant(String),

    #[error("private messages require at least one recipient")]
    EmptyRecipients,

    #[error("only the DM may post to the dm channel")]
    DmChannelForbidden,

    #[error("only the system identity may post to the system channel")]
    SystemChannelForbidden,

    #[error("rate limit exceeded")]
    RateLimited,
}

impl From<&ChatError> for ApiError {
    fn from(err: &ChatError) -> Self {
        match err {
            ChatError::InvalidLength { .. } | ChatError::EmptyRecipients => ApiError::InvalidArgument,
            ChatError::SenderNotParticipant
            | ChatError::RecipientNotParticipant(_)
            | ChatError::DmChannelForbidden
            | ChatError::SystemChannelForbidden => ApiError::Forbidden,
            ChatError::RateLimited => ApiError::ResourceExhausted,
        }
    }
}
