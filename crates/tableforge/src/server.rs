//! Server bootstrap and accept loop.
//!
//! Ties together transport, admission, sessions, and the room manager.
//! A connection handler task is spawned per accepted socket; the room
//! manager and broadcaster are the only process-wide shared state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tableforge_broadcast::Broadcaster;
use tableforge_config::AppConfig;
use tableforge_persistence::PersistenceGateway;
use tableforge_room::{ManagerConfig, RoomConfig, RoomManager};
use tableforge_session::{Authenticator, RateLimiter, SessionConfig, SessionManager};
use tableforge_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::ServerError;

/// How often the background maintenance task sweeps sessions and rooms.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Process-wide state shared across every connection handler task.
pub(crate) struct AppState<A: Authenticator> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: RoomManager,
    pub(crate) auth: A,
    pub(crate) started_at: Instant,
    pub(crate) persistence: Arc<dyn PersistenceGateway>,
    /// Per-connection admission rate limit, keyed by user id. Distinct from
    /// `tableforge-chat`'s own, tighter, per-channel limiter.
    pub(crate) rate_limiter: RateLimiter,
}

/// Builder for a [`TableforgeServer`].
pub struct TableforgeServerBuilder {
    bind_addr: String,
    room_config: ManagerConfig,
    session_config: SessionConfig,
    rate_limit_window: Duration,
    rate_limit_max_requests: u32,
}

impl TableforgeServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            room_config: ManagerConfig::default(),
            session_config: SessionConfig::default(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: 100,
        }
    }

    /// Seeds a builder from a loaded [`AppConfig`]: bind port, room cap,
    /// turn time limit, inactivity timeout, session watchdog timings, and
    /// the admission rate limit all come from the environment rather than
    /// these defaults.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", config.port),
            room_config: ManagerConfig {
                max_rooms_per_server: config.max_rooms_per_server,
                room: RoomConfig {
                    turn_time_limit: config.turn_time_limit,
                    inactivity_timeout: config.room_inactivity_timeout,
                    ..RoomConfig::default()
                },
            },
            session_config: SessionConfig {
                heartbeat_interval_secs: config.ws_heartbeat_interval.as_secs(),
                ..SessionConfig::default()
            },
            rate_limit_window: config.rate_limit_window,
            rate_limit_max_requests: config.rate_limit_max_requests,
        }
    }

    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn room_config(mut self, config: ManagerConfig) -> Self {
        self.room_config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub async fn build<A: Authenticator>(
        self,
        auth: A,
        persistence: Arc<dyn PersistenceGateway>,
    ) -> Result<TableforgeServer<A>, ServerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let broadcaster = Arc::new(Broadcaster::new());
        let rooms = RoomManager::new(self.room_config, broadcaster, persistence.clone());

        let state = Arc::new(AppState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms,
            auth,
            started_at: Instant::now(),
            persistence,
            rate_limiter: RateLimiter::new(self.rate_limit_window, self.rate_limit_max_requests),
        });

        Ok(TableforgeServer { transport, state })
    }
}

impl Default for TableforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running live interaction server. Call [`run`](Self::run) to start
/// accepting connections.
pub struct TableforgeServer<A: Authenticator> {
    transport: WebSocketTransport,
    state: Arc<AppState<A>>,
}

impl<A: Authenticator> TableforgeServer<A> {
    pub fn builder() -> TableforgeServerBuilder {
        TableforgeServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated. A failed
    /// accept is logged and does not tear down the server. Spawns a
    /// background maintenance task alongside it that sweeps stale sessions
    /// and idle rooms.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("tableforge server running");

        tokio::spawn(run_maintenance(Arc::clone(&self.state)));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(conn, state).await {
                            tracing::debug!(error = %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "accept failed");
                }
            }
        }
    }
}

/// Periodically flags sessions that have gone quiet past the heartbeat
/// interval, expires ones stuck disconnected past the reconnect grace
/// window, drops evicted entries, and sweeps completed or inactive rooms.
/// Runs for the lifetime of the server; never returns.
async fn run_maintenance<A: Authenticator>(state: Arc<AppState<A>>) {
    let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let stale = {
            let mut sessions = state.sessions.lock().await;
            let watchdog_hits = sessions.check_heartbeat_watchdog();
            for user_id in &watchdog_hits {
                let _ = sessions.disconnect(user_id);
            }
            let expired = sessions.expire_stale();
            sessions.cleanup_evicted();
            watchdog_hits.len() + expired.len()
        };
        if stale > 0 {
            tracing::debug!(stale, "session maintenance swept stale sessions");
        }

        let removed = state.rooms.cleanup_completed_rooms().await;
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "room maintenance removed completed or inactive rooms");
        }
    }
}

