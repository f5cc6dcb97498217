//! Error types for the event broadcaster.

use tableforge_protocol::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("no subscribers for interaction {0}")]
    NoSubscribers(String),

    #[error("subscriber {0} not found")]
    SubscriberNotFound(String),
}

impl From<&BroadcastError> for ApiError {
    fn from(err: &BroadcastError) -> Self {
        match err {
            BroadcastError::NoSubscribers(_) => ApiError::NotFound,
            BroadcastError::SubscriberNotFound(_) => ApiError::NotFound,
        }
    }
}
