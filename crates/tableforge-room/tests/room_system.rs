//! Integration tests exercising a room end-to-end through its public
//! command surface: join, act, pause/resume, chat, completion.

use std::sync::Arc;
use std::time::Duration;

use tableforge_broadcast::Broadcaster;
use tableforge_persistence::{InMemoryPersistence, PersistenceGateway};
use tableforge_protocol::{
    ActionType, ChatChannel, EntityId, EntityType, GameEvent, GameState, InteractionId,
    InteractionStatus, MapState, TurnAction, UserId,
};
use tableforge_room::{ManagerConfig, RoomManager};

fn empty_state(interaction_id: &str) -> GameState {
    GameState {
        interaction_id: InteractionId::new(interaction_id),
        status: InteractionStatus::Waiting,
        initiative_order: vec![],
        current_turn_index: 0,
        round_number: 1,
        participants: vec![],
        map_state: MapState { width: 20, height: 20, entities: vec![], obstacles: vec![], terrain: vec![] },
        turn_history: vec![],
        chat_log: vec![],
        timestamp: chrono::Utc::now(),
    }
}

fn setup() -> (RoomManager, Arc<Broadcaster>) {
    let broadcaster = Arc::new(Broadcaster::new());
    let persistence: Arc<dyn PersistenceGateway> = Arc::new(InMemoryPersistence::new());
    let manager = RoomManager::new(ManagerConfig::default(), broadcaster.clone(), persistence);
    (manager, broadcaster)
}

#[tokio::test]
async fn test_join_adds_participant_and_rebuilds_initiative() {
    let (manager, broadcaster) = setup();
    let interaction_id = InteractionId::new("int-1");
    let handle = manager.create_room(interaction_id.clone(), Some(empty_state("int-1"))).await.unwrap();

    let mut events = broadcaster.subscribe(interaction_id.clone(), UserId::new("u1"), false);
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    let state = handle.state().await.unwrap();
    assert_eq!(state.participants.len(), 1);
    assert_eq!(state.initiative_order.len(), 1);

    let joined = events.recv().await.unwrap();
    assert!(matches!(joined, GameEvent::ParticipantJoined { .. }));
    let initiative = events.recv().await.unwrap();
    assert!(matches!(initiative, GameEvent::InitiativeUpdated { .. }));
}

#[tokio::test]
async fn test_join_twice_for_same_user_fails() {
    let (manager, _broadcaster) = setup();
    let handle = manager.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();

    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();
    let result = handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_process_turn_action_rejected_when_interaction_not_active() {
    let (manager, _broadcaster) = setup();
    let handle = manager.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    let action = TurnAction {
        entity_id: EntityId::new("e1"),
        action_type: ActionType::End,
        position: None,
        target_entity_id: None,
        item_id: None,
        spell_id: None,
        damage: None,
        parameters: serde_json::Value::Null,
    };
    let result = handle.process_turn_action(action).await;
    assert!(result.is_err());
}

fn active_state_with_one_participant(interaction_id: &str) -> GameState {
    use tableforge_protocol::{InitiativeEntry, Inventory, Participant, Position, TurnStatus};

    let entity_id = EntityId::new("e1");
    let mut state = empty_state(interaction_id);
    state.status = InteractionStatus::Active;
    state.participants.push(Participant {
        entity_id: entity_id.clone(),
        entity_type: EntityType::PlayerCharacter,
        user_id: UserId::new("u1"),
        is_dm: false,
        current_hp: 10,
        max_hp: 10,
        position: Position { x: 0, y: 0 },
        movement_speed: 6,
        conditions: vec![],
        inventory: Inventory { items: vec![], equipped: vec![], capacity: 0 },
        available_actions: vec!["move".into(), "end".into()],
        turn_status: TurnStatus::Active,
    });
    state.initiative_order = vec![InitiativeEntry {
        entity_id,
        entity_type: EntityType::PlayerCharacter,
        initiative: 10,
        user_id: Some(UserId::new("u1")),
    }];
    state
}

fn end_turn_action() -> TurnAction {
    TurnAction {
        entity_id: EntityId::new("e1"),
        action_type: ActionType::End,
        position: None,
        target_entity_id: None,
        item_id: None,
        spell_id: None,
        damage: None,
        parameters: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn test_process_turn_action_advances_round_on_single_participant_wraparound() {
    let (manager, _broadcaster) = setup();
    let handle = manager
        .create_room(InteractionId::new("int-1"), Some(active_state_with_one_participant("int-1")))
        .await
        .unwrap();
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    handle.process_turn_action(end_turn_action()).await.unwrap();

    let state = handle.state().await.unwrap();
    assert_eq!(state.round_number, 2);
    assert_eq!(state.turn_history.len(), 1);
}

#[tokio::test]
async fn test_process_turn_action_rejects_wrong_entity() {
    let (manager, _broadcaster) = setup();
    let handle = manager
        .create_room(InteractionId::new("int-1"), Some(active_state_with_one_participant("int-1")))
        .await
        .unwrap();

    let mut action = end_turn_action();
    action.entity_id = EntityId::new("not-the-active-entity");
    let result = handle.process_turn_action(action).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_send_chat_message_appends_to_log_and_broadcasts() {
    let (manager, broadcaster) = setup();
    let interaction_id = InteractionId::new("int-1");
    let handle = manager.create_room(interaction_id.clone(), Some(empty_state("int-1"))).await.unwrap();
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    let mut events = broadcaster.subscribe(interaction_id.clone(), UserId::new("observer"), false);
    handle
        .send_chat_message(UserId::new("u1"), false, "hello party", ChatChannel::Party, None)
        .await
        .unwrap();

    let state = handle.state().await.unwrap();
    assert_eq!(state.chat_log.len(), 1);

    // drain the join/initiative events first
    let _ = events.recv().await;
    let _ = events.recv().await;
    let chat_event = events.recv().await.unwrap();
    assert!(matches!(chat_event, GameEvent::ChatMessageEvent { .. }));
}

#[tokio::test]
async fn test_send_chat_message_on_dm_channel_rejected_for_non_dm() {
    let (manager, _broadcaster) = setup();
    let handle = manager.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    let result = handle.send_chat_message(UserId::new("u1"), false, "secret", ChatChannel::Dm, None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_get_chat_history_hides_dm_channel_from_non_dm() {
    let (manager, _broadcaster) = setup();
    let handle = manager.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();
    handle.join(UserId::new("dm"), EntityId::new("e-dm"), EntityType::Npc, true).await.unwrap();
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    handle.send_chat_message(UserId::new("dm"), true, "party line", ChatChannel::Party, None).await.unwrap();
    handle.send_chat_message(UserId::new("dm"), true, "dm only note", ChatChannel::Dm, None).await.unwrap();

    let player_view = handle.get_chat_history(UserId::new("u1"), false, None, None).await.unwrap();
    assert_eq!(player_view.len(), 1);
    assert_eq!(player_view[0].content, "party line");

    let dm_view = handle.get_chat_history(UserId::new("dm"), true, None, None).await.unwrap();
    assert_eq!(dm_view.len(), 2);
}

#[tokio::test]
async fn test_leave_removes_participant() {
    let (manager, _broadcaster) = setup();
    let handle = manager.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();
    handle.join(UserId::new("u1"), EntityId::new("e1"), EntityType::PlayerCharacter, false).await.unwrap();

    handle.leave(UserId::new("u1")).await.unwrap();
    let state = handle.state().await.unwrap();
    assert!(state.participants.is_empty());
}

#[tokio::test]
async fn test_dm_disconnect_pauses_active_room() {
    let (manager, _broadcaster) = setup();
    let mut state = empty_state("int-1");
    state.status = InteractionStatus::Active;
    let handle = manager.create_room(InteractionId::new("int-1"), Some(state)).await.unwrap();
    handle.join(UserId::new("dm"), EntityId::new("e1"), EntityType::Npc, true).await.unwrap();

    handle.update_connection(UserId::new("dm"), false).await.unwrap();
    let state = handle.state().await.unwrap();
    assert_eq!(state.status, InteractionStatus::Paused);
}

#[tokio::test]
async fn test_dm_reconnect_resumes_paused_room() {
    let (manager, _broadcaster) = setup();
    let mut state = empty_state("int-1");
    state.status = InteractionStatus::Active;
    let handle = manager.create_room(InteractionId::new("int-1"), Some(state)).await.unwrap();
    handle.join(UserId::new("dm"), EntityId::new("e1"), EntityType::Npc, true).await.unwrap();
    handle.update_connection(UserId::new("dm"), false).await.unwrap();

    handle.update_connection(UserId::new("dm"), true).await.unwrap();
    let state = handle.state().await.unwrap();
    assert_eq!(state.status, InteractionStatus::Active);
}

#[tokio::test]
async fn test_complete_refuses_from_waiting_status() {
    let (manager, _broadcaster) = setup();
    let handle = manager.create_room(InteractionId::new("int-1"), Some(empty_state("int-1"))).await.unwrap();
    let result = handle.complete("done").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_complete_from_active_persists_and_emits_event() {
    let (manager, broadcaster) = setup();
    let interaction_id = InteractionId::new("int-1");
    let mut state = empty_state("int-1");
    state.status = InteractionStatus::Active;
    let handle = manager.create_room(interaction_id.clone(), Some(state)).await.unwrap();

    let mut events = broadcaster.subscribe(interaction_id.clone(), UserId::new("observer"), false);
    handle.complete("session wrapped up").await.unwrap();

    let state = handle.state().await.unwrap();
    assert_eq!(state.status, InteractionStatus::Completed);
    let event = events.recv().await.unwrap();
    assert!(matches!(event, GameEvent::InteractionCompleted { .. }));
}

#[tokio::test]
async fn test_cleanup_completed_rooms_removes_completed() {
    let (manager, _broadcaster) = setup();
    let mut state = empty_state("int-1");
    state.status = InteractionStatus::Active;
    let handle = manager.create_room(InteractionId::new("int-1"), Some(state)).await.unwrap();
    handle.complete("wrapped").await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    let removed = manager.cleanup_completed_rooms().await;
    assert_eq!(removed.len(), 1);
    assert_eq!(manager.room_count(), 0);
}
