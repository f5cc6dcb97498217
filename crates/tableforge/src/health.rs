//! The `health` operation: a cheap, dependency-aware liveness check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tableforge_persistence::PersistenceGateway;
use tableforge_room::RoomManager;

use crate::message::{ServerStats, ServiceStatus};

/// How long the persistence probe waits before treating the gateway as
/// unreachable, so a slow backend can't stall every health check.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Builds the health response from current server state.
///
/// `websocket` is always `true` once this function runs (it only runs
/// inside a live accept loop). `persistence` is probed live with a cheap
/// read of a reserved, never-written key — a miss is a normal outcome for
/// that probe, only a transport-level error counts against health.
pub async fn check(
    started_at: Instant,
    rooms: &RoomManager,
    persistence: &Arc<dyn PersistenceGateway>,
) -> (bool, ServiceStatus, ServerStats) {
    let mut total_participants = 0;
    let mut active_rooms = 0;
    for interaction_id in rooms.interaction_ids() {
        if let Some(handle) = rooms.get(&interaction_id) {
            if let Ok(info) = handle.info().await {
                active_rooms += 1;
                total_participants += info.member_count;
            }
        }
    }

    let persistence_healthy = matches!(
        tokio::time::timeout(PROBE_TIMEOUT, persistence.read("_health", "_probe")).await,
        Ok(Ok(_))
    );

    let services = ServiceStatus { persistence: persistence_healthy, websocket: true };
    let healthy = services.persistence && services.websocket;
    let stats = ServerStats { active_rooms, total_participants };

    let _ = started_at.elapsed();
    (healthy, services, stats)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tableforge_broadcast::Broadcaster;
    use tableforge_persistence::{InMemoryPersistence, PersistenceGateway};
    use tableforge_protocol::{GameState, InteractionId, InteractionStatus, MapState};
    use tableforge_room::ManagerConfig;

    use super::*;

    fn empty_state(interaction_id: &str) -> GameState {
        GameState {
            interaction_id: InteractionId::new(interaction_id),
            status: InteractionStatus::Waiting,
            initiative_order: vec![],
            current_turn_index: 0,
            round_number: 1,
            participants: vec![],
            map_state: MapState { width: 10, height: 10, entities: vec![], obstacles: vec![], terrain: vec![] },
            turn_history: vec![],
            chat_log: vec![],
            timestamp: chrono::Utc::now(),
        }
    }

    struct FailingPersistence;

    #[async_trait::async_trait]
    impl PersistenceGateway for FailingPersistence {
        async fn read(&self, _collection: &str, _id: &str) -> Result<Option<serde_json::Value>, tableforge_persistence::PersistenceError> {
            Err(tableforge_persistence::PersistenceError::Unavailable("down for maintenance".into()))
        }
        async fn write(&self, _collection: &str, _id: &str, _document: serde_json::Value) -> Result<(), tableforge_persistence::PersistenceError> {
            Err(tableforge_persistence::PersistenceError::Unavailable("down for maintenance".into()))
        }
        async fn query(&self, _collection: &str, _filter: serde_json::Value) -> Result<Vec<serde_json::Value>, tableforge_persistence::PersistenceError> {
            Err(tableforge_persistence::PersistenceError::Unavailable("down for maintenance".into()))
        }
        async fn delete(&self, _collection: &str, _id: &str) -> Result<(), tableforge_persistence::PersistenceError> {
            Err(tableforge_persistence::PersistenceError::Unavailable("down for maintenance".into()))
        }
    }

    #[tokio::test]
    async fn test_check_reports_healthy_with_no_rooms() {
        let broadcaster = Arc::new(Broadcaster::new());
        let persistence: Arc<dyn PersistenceGateway> = Arc::new(InMemoryPersistence::new());
        let rooms = RoomManager::new(ManagerConfig::default(), broadcaster, persistence.clone());

        let (healthy, services, stats) = check(Instant::now(), &rooms, &persistence).await;
        assert!(healthy);
        assert!(services.websocket);
        assert_eq!(stats.active_rooms, 0);
        assert_eq!(stats.total_participants, 0);
    }

    #[tokio::test]
    async fn test_check_counts_active_rooms_and_participants() {
        let broadcaster = Arc::new(Broadcaster::new());
        let persistence: Arc<dyn PersistenceGateway> = Arc::new(InMemoryPersistence::new());
        let rooms = RoomManager::new(ManagerConfig::default(), broadcaster, persistence.clone());
        let handle = rooms.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();
        handle
            .join(
                tableforge_protocol::UserId::new("u1"),
                tableforge_protocol::EntityId::new("e1"),
                tableforge_protocol::EntityType::PlayerCharacter,
                false,
            )
            .await
            .unwrap();

        let (_, _, stats) = check(Instant::now(), &rooms, &persistence).await;
        assert_eq!(stats.active_rooms, 1);
        assert_eq!(stats.total_participants, 1);
    }

    #[tokio::test]
    async fn test_check_reports_unhealthy_when_persistence_down() {
        let broadcaster = Arc::new(Broadcaster::new());
        let persistence: Arc<dyn PersistenceGateway> = Arc::new(FailingPersistence);
        let rooms = RoomManager::new(ManagerConfig::default(), broadcaster, persistence.clone());

        let (healthy, services, _) = check(Instant::now(), &rooms, &persistence).await;
        assert!(!healthy);
        assert!(!services.persistence);
    }
}
