//! Chat service: channel-scoped messaging, rate limiting, content
//! filtering, and visibility-aware history.

mod error;
mod filter;
mod service;

pub use error::ChatError;
pub use filter::ContentFilter;
pub use service::{ChatConfig, ChatService, Sender};
