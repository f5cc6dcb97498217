//! Session types: the data structures that represent a connected user.
//!
//! A "session" is the server's record of a connected user. It tracks:
//! - WHO the user is (`UserId`)
//! - WHAT state they're in (connected, disconnected, evicted)
//! - HOW they can reconnect (a secret token)
//! - WHEN they disconnected, and how many times they've tried to come back

use std::time::Instant;

use tableforge_protocol::UserId;

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected user has to reconnect before another
    /// attempt is allowed to be counted. Default: 30 seconds.
    pub reconnect_grace_secs: u64,

    /// How many times a user may reconnect before the session is evicted
    /// outright. Default: 5, per the connection handler's eviction rule.
    pub max_reconnect_attempts: u32,

    /// How long a connected session may go without a heartbeat before
    /// the watchdog treats it as disconnected. Default: 30 seconds.
    pub heartbeat_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
            max_reconnect_attempts: 5,
            heartbeat_interval_secs: 30,
        }
    }
}

/// The current state of a user's session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapses again)──→ Disconnected
///       ↑                            │                                      │
///       └────────(reconnect)─────────┘                      (attempts exhausted)
///                                                                          ↓
///                                                                      Evicted
/// ```
///
/// - **Connected**: actively connected, heartbeats arriving on schedule.
/// - **Disconnected**: lost connection but may come back within the grace
///   window. `since` records when, `attempts` how many times this session
///   has already reconnected.
/// - **Evicted**: terminal. Either the grace window elapsed too many times
///   or `max_reconnect_attempts` was exceeded. The user must authenticate
///   again to get a brand-new session.
#[derive(Debug, Clone)]
pub enum SessionState {
    Connected,
    Disconnected { since: Instant },
    Evicted,
}

/// A single user's session on the server.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub state: SessionState,
    /// A secret token the user can use to reconnect after a disconnect,
    /// a 32-character hex string (128 bits of randomness).
    pub reconnect_token: String,
    /// Number of times this session has been reconnected.
    pub reconnect_attempts: u32,
    pub last_heartbeat: Instant,
}
