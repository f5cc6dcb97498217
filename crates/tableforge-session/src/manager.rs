//! The session manager: tracks all active user sessions.
//!
//! Responsible for:
//! - Creating sessions after successful admission
//! - Tracking who's connected/disconnected
//! - Validating reconnection tokens, counting reconnection attempts
//! - Evicting sessions that exceed the grace window or attempt budget
//! - Watchdog: surfacing sessions that have gone quiet past the heartbeat
//!   interval
//!
//! # Concurrency note
//!
//! `SessionManager` is not internally thread-safe — it uses a plain
//! `HashMap`, not a concurrent one. It's intended to be owned by a single
//! task (e.g. the room manager's admission path) and accessed through a
//! channel or a mutex at a higher level.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tableforge_protocol::UserId;

use crate::{Session, SessionConfig, SessionError, SessionState};

pub struct SessionManager {
    sessions: HashMap<UserId, Session>,
    tokens: HashMap<String, UserId>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self { sessions: HashMap::new(), tokens: HashMap::new(), config }
    }

    /// Creates a new session for a user after successful admission.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the user already has an active
    /// (Connected) session.
    pub fn create(&mut self, user_id: UserId) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&user_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(user_id));
            }
            self.tokens.remove(&existing.reconnect_token);
        }

        let token = generate_token();
        let session = Session {
            user_id: user_id.clone(),
            state: SessionState::Connected,
            reconnect_token: token.clone(),
            reconnect_attempts: 0,
            last_heartbeat: Instant::now(),
        };

        self.tokens.insert(token, user_id.clone());
        self.sessions.insert(user_id.clone(), session);

        tracing::info!(%user_id, "session created");
        Ok(self.sessions.get(&user_id).expect("just inserted"))
    }

    /// Marks a user as disconnected, starting the reconnection grace window.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(&mut self, user_id: &UserId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.clone()))?;

        session.state = SessionState::Disconnected { since: Instant::now() };
        tracing::info!(%user_id, "session disconnected, grace window started");
        Ok(())
    }

    /// Records a heartbeat, keeping the session's watchdog clock fresh.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session exists.
    pub fn heartbeat(&mut self, user_id: &UserId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound(user_id.clone()))?;
        session.last_heartbeat = Instant::now();
        Ok(())
    }

    /// Reconnects a user using their reconnection token.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] — token not recognized.
    /// - [`SessionError::Evicted`] — grace window elapsed, or the user has
    ///   already exhausted `max_reconnect_attempts`.
    pub fn reconnect(&mut self, token: &str) -> Result<&Session, SessionError> {
        let user_id = self.tokens.get(token).cloned().ok_or(SessionError::InvalidToken)?;

        let session =
            self.sessions.get_mut(&user_id).ok_or(SessionError::InvalidToken)?;

        match &session.state {
            SessionState::Disconnected { since } => {
                let grace = Duration::from_secs(self.config.reconnect_grace_secs);
                if since.elapsed() > grace {
                    session.state = SessionState::Evicted;
                    return Err(SessionError::Evicted(user_id));
                }
                if session.reconnect_attempts >= self.config.max_reconnect_attempts {
                    session.state = SessionState::Evicted;
                    return Err(SessionError::Evicted(user_id));
                }
                session.reconnect_attempts += 1;
                session.state = SessionState::Connected;
                session.last_heartbeat = Instant::now();
                tracing::info!(%user_id, attempts = session.reconnect_attempts, "session reconnected");
                Ok(self.sessions.get(&user_id).expect("just modified"))
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(user_id)),
            SessionState::Evicted => Err(SessionError::Evicted(user_id)),
        }
    }

    /// Scans all sessions and evicts those whose grace window has elapsed.
    /// Returns the list of evicted user ids.
    pub fn expire_stale(&mut self) -> Vec<UserId> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut evicted = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = &session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Evicted;
                    evicted.push(session.user_id.clone());
                    tracing::info!(user_id = %session.user_id, "session evicted (grace window elapsed)");
                }
            }
        }

        evicted
    }

    /// Scans all Connected sessions for heartbeat silence past the
    /// configured interval. Returns the user ids whose heartbeat watchdog
    /// has tripped — callers should treat these as implicitly disconnected.
    pub fn check_heartbeat_watchdog(&self) -> Vec<UserId> {
        let interval = Duration::from_secs(self.config.heartbeat_interval_secs);
        self.sessions
            .values()
            .filter(|s| matches!(s.state, SessionState::Connected))
            .filter(|s| s.last_heartbeat.elapsed() > interval)
            .map(|s| s.user_id.clone())
            .collect()
    }

    /// Removes all evicted sessions, freeing memory.
    pub fn cleanup_evicted(&mut self) {
        let tokens = &mut self.tokens;
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Evicted) {
                tokens.remove(&session.reconnect_token);
                false
            } else {
                true
            }
        });
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Session> {
        self.sessions.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex reconnection token (128 bits).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_instant_expiry() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: 0,
            max_reconnect_attempts: 5,
            heartbeat_interval_secs: 30,
        })
    }

    fn manager_with_long_grace() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: 3600,
            max_reconnect_attempts: 5,
            heartbeat_interval_secs: 30,
        })
    }

    fn uid(raw: &str) -> UserId {
        UserId::new(raw)
    }

    #[test]
    fn test_create_new_user_returns_connected_session() {
        let mut mgr = manager_with_long_grace();
        let session = mgr.create(uid("u1")).expect("should succeed");
        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.user_id, uid("u1"));
        assert_eq!(session.reconnect_token.len(), 32);
    }

    #[test]
    fn test_create_multiple_users_each_gets_unique_token() {
        let mut mgr = manager_with_long_grace();
        let token1 = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        let token2 = mgr.create(uid("u2")).unwrap().reconnect_token.clone();
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_create_already_connected_returns_error() {
        let mut mgr = manager_with_long_grace();
        mgr.create(uid("u1")).unwrap();
        let result = mgr.create(uid("u1"));
        assert!(matches!(result, Err(SessionError::AlreadyConnected(u)) if u == uid("u1")));
    }

    #[test]
    fn test_create_replaces_disconnected_session() {
        let mut mgr = manager_with_long_grace();
        mgr.create(uid("u1")).unwrap();
        mgr.disconnect(&uid("u1")).unwrap();
        let session = mgr.create(uid("u1")).expect("should replace");
        assert!(matches!(session.state, SessionState::Connected));
    }

    #[test]
    fn test_disconnect_unknown_user_returns_not_found() {
        let mut mgr = manager_with_long_grace();
        let result = mgr.disconnect(&uid("ghost"));
        assert!(matches!(result, Err(SessionError::NotFound(u)) if u == uid("ghost")));
    }

    #[test]
    fn test_reconnect_valid_token_restores_connected_and_counts_attempt() {
        let mut mgr = manager_with_long_grace();
        let token = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        mgr.disconnect(&uid("u1")).unwrap();

        let session = mgr.reconnect(&token).expect("should succeed");
        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.reconnect_attempts, 1);
    }

    #[test]
    fn test_reconnect_invalid_token_returns_error() {
        let mut mgr = manager_with_long_grace();
        mgr.create(uid("u1")).unwrap();
        mgr.disconnect(&uid("u1")).unwrap();
        let result = mgr.reconnect("not-a-real-token");
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_reconnect_after_grace_window_returns_evicted() {
        let mut mgr = manager_with_instant_expiry();
        let token = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        mgr.disconnect(&uid("u1")).unwrap();
        let result = mgr.reconnect(&token);
        assert!(matches!(result, Err(SessionError::Evicted(u)) if u == uid("u1")));
    }

    #[test]
    fn test_reconnect_past_max_attempts_returns_evicted() {
        let mut mgr = SessionManager::new(SessionConfig {
            reconnect_grace_secs: 3600,
            max_reconnect_attempts: 1,
            heartbeat_interval_secs: 30,
        });
        let token = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        mgr.disconnect(&uid("u1")).unwrap();
        mgr.reconnect(&token).expect("first reconnect allowed");
        mgr.disconnect(&uid("u1")).unwrap();
        let result = mgr.reconnect(&token);
        assert!(matches!(result, Err(SessionError::Evicted(u)) if u == uid("u1")));
    }

    #[test]
    fn test_expire_stale_evicts_timed_out_sessions() {
        let mut mgr = manager_with_instant_expiry();
        mgr.create(uid("u1")).unwrap();
        mgr.create(uid("u2")).unwrap();
        mgr.disconnect(&uid("u1")).unwrap();

        let evicted = mgr.expire_stale();
        assert_eq!(evicted, vec![uid("u1")]);
        assert!(matches!(mgr.get(&uid("u2")).unwrap().state, SessionState::Connected));
    }

    #[test]
    fn test_check_heartbeat_watchdog_flags_silent_connected_sessions() {
        let mut mgr = SessionManager::new(SessionConfig {
            reconnect_grace_secs: 3600,
            max_reconnect_attempts: 5,
            heartbeat_interval_secs: 0,
        });
        mgr.create(uid("u1")).unwrap();
        let flagged = mgr.check_heartbeat_watchdog();
        assert_eq!(flagged, vec![uid("u1")]);
    }

    #[test]
    fn test_check_heartbeat_watchdog_ignores_disconnected_sessions() {
        let mut mgr = SessionManager::new(SessionConfig {
            reconnect_grace_secs: 3600,
            max_reconnect_attempts: 5,
            heartbeat_interval_secs: 0,
        });
        mgr.create(uid("u1")).unwrap();
        mgr.disconnect(&uid("u1")).unwrap();
        assert!(mgr.check_heartbeat_watchdog().is_empty());
    }

    #[test]
    fn test_cleanup_evicted_removes_evicted_sessions_and_invalidates_token() {
        let mut mgr = manager_with_instant_expiry();
        let token = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        mgr.disconnect(&uid("u1")).unwrap();
        mgr.expire_stale();
        assert_eq!(mgr.len(), 1);

        mgr.cleanup_evicted();
        assert_eq!(mgr.len(), 0);

        let result = mgr.reconnect(&token);
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_full_lifecycle_connect_disconnect_reconnect() {
        let mut mgr = manager_with_long_grace();
        let token = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        mgr.disconnect(&uid("u1")).unwrap();
        mgr.reconnect(&token).unwrap();
        assert!(matches!(mgr.get(&uid("u1")).unwrap().state, SessionState::Connected));
    }

    #[test]
    fn test_multiple_users_independent_lifecycles() {
        let mut mgr = manager_with_long_grace();
        let token1 = mgr.create(uid("u1")).unwrap().reconnect_token.clone();
        mgr.create(uid("u2")).unwrap();

        mgr.disconnect(&uid("u1")).unwrap();
        mgr.reconnect(&token1).unwrap();

        assert!(matches!(mgr.get(&uid("u2")).unwrap().state, SessionState::Connected));
        assert!(matches!(mgr.get(&uid("u1")).unwrap().state, SessionState::Connected));
    }
}
