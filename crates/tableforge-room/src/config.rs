//! Room and room-manager configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long a participant has to act before their turn is auto-skipped.
    pub turn_time_limit: Duration,
    /// How long an idle room (no activity) is kept before cleanup.
    pub inactivity_timeout: Duration,
    /// How long the room waits after the DM disconnects before auto-pausing.
    pub dm_disconnect_grace: Duration,
    /// Snapshot ring capacity for error recovery rollback.
    pub snapshot_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            turn_time_limit: Duration::from_secs(90),
            inactivity_timeout: Duration::from_secs(1800),
            dm_disconnect_grace: Duration::from_secs(120),
            snapshot_capacity: tableforge_protocol::DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub max_rooms_per_server: usize,
    pub room: RoomConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { max_rooms_per_server: 1000, room: RoomConfig::default() }
    }
}
