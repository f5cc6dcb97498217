//! Room manager: the directory of active rooms, keyed by interaction id.

use std::sync::Arc;

use dashmap::DashMap;
use tableforge_broadcast::Broadcaster;
use tableforge_persistence::PersistenceGateway;
use tableforge_protocol::{GameState, InteractionId, InteractionStatus};
use tokio::sync::broadcast;

use crate::config::ManagerConfig;
use crate::error::RoomError;
use crate::room::{spawn_room, RoomHandle, RoomInfo};

/// Observable lifecycle events the manager publishes for anything watching
/// the room directory (health endpoints, admin tooling, tests).
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    RoomCreated { interaction_id: InteractionId },
    RoomRemoved { interaction_id: InteractionId },
    RoomCompleted { interaction_id: InteractionId },
}

pub struct RoomManager {
    config: ManagerConfig,
    rooms: DashMap<InteractionId, RoomHandle>,
    broadcaster: Arc<Broadcaster>,
    persistence: Arc<dyn PersistenceGateway>,
    events: broadcast::Sender<ManagerEvent>,
}

impl RoomManager {
    pub fn new(config: ManagerConfig, broadcaster: Arc<Broadcaster>, persistence: Arc<dyn PersistenceGateway>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { config, rooms: DashMap::new(), broadcaster, persistence, events }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    /// Returns the shared broadcaster, so a caller (the connection handler)
    /// can subscribe to a room's events without going through the room
    /// itself.
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    /// Creates a room for `interaction_id`, loading its initial state from
    /// persistence when `initial_state` is `None`.
    pub async fn create_room(
        &self,
        interaction_id: InteractionId,
        initial_state: Option<GameState>,
    ) -> Result<RoomHandle, RoomError> {
        if self.rooms.len() >= self.config.max_rooms_per_server {
            return Err(RoomError::ActionRejected("room capacity exceeded".to_string()));
        }
        if self.rooms.contains_key(&interaction_id) {
            return Err(RoomError::ActionRejected(format!("room {interaction_id} already exists")));
        }

        let state = match initial_state {
            Some(state) => state,
            None => self.load_initial_state(&interaction_id).await?,
        };

        let handle = spawn_room(state, self.config.room.clone(), self.broadcaster.clone(), self.persistence.clone());
        self.rooms.insert(interaction_id.clone(), handle.clone());
        tracing::info!(%interaction_id, "room created");
        let _ = self.events.send(ManagerEvent::RoomCreated { interaction_id });
        Ok(handle)
    }

    async fn load_initial_state(&self, interaction_id: &InteractionId) -> Result<GameState, RoomError> {
        let document = self
            .persistence
            .read("game_states", interaction_id.as_str())
            .await
            .map_err(|err| RoomError::ActionRejected(err.to_string()))?
            .ok_or_else(|| RoomError::NotFound(interaction_id.clone()))?;
        serde_json::from_value(document).map_err(|err| RoomError::ActionRejected(err.to_string()))
    }

    pub fn get(&self, interaction_id: &InteractionId) -> Option<RoomHandle> {
        self.rooms.get(interaction_id).map(|entry| entry.clone())
    }

    /// Returns the existing room for `interaction_id`, creating one if it
    /// doesn't exist yet — reading its state from persistence when a record
    /// is found, otherwise starting fresh from `fresh`.
    ///
    /// Tolerates the benign race of two callers joining the same new
    /// interaction concurrently: whichever loses the `create_room` call
    /// falls back to the handle its sibling installed.
    pub async fn get_or_create_room(
        &self,
        interaction_id: InteractionId,
        fresh: GameState,
    ) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.get(&interaction_id) {
            return Ok(handle);
        }

        match self.create_room(interaction_id.clone(), None).await {
            Ok(handle) => Ok(handle),
            Err(RoomError::NotFound(_)) => match self.create_room(interaction_id.clone(), Some(fresh)).await {
                Ok(handle) => Ok(handle),
                Err(RoomError::ActionRejected(_)) => {
                    self.get(&interaction_id).ok_or(RoomError::Unavailable)
                }
                Err(other) => Err(other),
            },
            Err(RoomError::ActionRejected(_)) => self.get(&interaction_id).ok_or(RoomError::Unavailable),
            Err(other) => Err(other),
        }
    }

    pub async fn remove_room(&self, interaction_id: &InteractionId) -> Result<(), RoomError> {
        let (_, handle) = self.rooms.remove(interaction_id).ok_or_else(|| RoomError::NotFound(interaction_id.clone()))?;
        let _ = handle.shutdown().await;
        self.broadcaster.remove_interaction(interaction_id);
        tracing::info!(%interaction_id, "room removed");
        let _ = self.events.send(ManagerEvent::RoomRemoved { interaction_id: interaction_id.clone() });
        Ok(())
    }

    pub async fn complete_room(&self, interaction_id: &InteractionId, reason: impl Into<String>) -> Result<(), RoomError> {
        let handle = self.get(interaction_id).ok_or_else(|| RoomError::NotFound(interaction_id.clone()))?;
        handle.complete(reason).await?;
        let _ = self.events.send(ManagerEvent::RoomCompleted { interaction_id: interaction_id.clone() });
        Ok(())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn interaction_ids(&self) -> Vec<InteractionId> {
        self.rooms.iter().map(|e| e.key().clone()).collect()
    }

    /// Removes rooms whose status is `completed`, and separately sweeps out
    /// rooms that have gone idle past `RoomConfig.inactivity_timeout` even
    /// though nobody ever explicitly completed them. Persists nothing
    /// further for the completed case — `Complete` already wrote the
    /// completion record.
    pub async fn cleanup_completed_rooms(&self) -> Vec<InteractionId> {
        let mut removed = Vec::new();
        let candidates: Vec<InteractionId> = self.rooms.iter().map(|e| e.key().clone()).collect();
        for interaction_id in candidates {
            let Some(handle) = self.get(&interaction_id) else { continue };
            let Ok(info) = handle.info().await else { continue };
            let completed = matches!(info, RoomInfo { status: InteractionStatus::Completed, .. });
            let inactive = info.idle_duration > self.config.room.inactivity_timeout;
            if completed || inactive {
                if completed {
                    tracing::debug!(%interaction_id, "removing completed room");
                } else {
                    tracing::info!(%interaction_id, idle_secs = info.idle_duration.as_secs(), "removing inactive room");
                }
                if self.remove_room(&interaction_id).await.is_ok() {
                    removed.push(interaction_id);
                }
            }
        }
        removed
    }
}
