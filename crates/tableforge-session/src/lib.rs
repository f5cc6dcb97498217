//! Connection handling and admission for the live interaction server.
//!
//! This crate handles:
//!
//! 1. **Admission** — resolving a bearer credential into an identity
//!    ([`Authenticator`] trait) and enforcing the per-connection request
//!    rate limit ([`RateLimiter`]).
//! 2. **Session tracking** — knowing who's connected, disconnected, or
//!    evicted ([`SessionManager`]).
//! 3. **Reconnection** — letting users resume after brief disconnects,
//!    token-based, with a configurable grace window and attempt budget.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)   ← uses sessions to know which users are in which rooms
//!     ↕
//! Session layer (this crate)  ← admission, identity, connection state
//!     ↕
//! Protocol layer (below)      ← provides UserId, SessionId types
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod ratelimit;
mod session;

pub use auth::{Authenticator, Identity};
pub use error::SessionError;
pub use manager::SessionManager;
pub use ratelimit::RateLimiter;
pub use session::{Session, SessionConfig, SessionState};
