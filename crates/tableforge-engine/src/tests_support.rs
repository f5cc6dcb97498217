//! Shared construction helpers for engine unit tests.

use chrono::Utc;
use tableforge_protocol::{
    EntityId, EntityType, GameState, Inventory, InteractionId, InteractionStatus, MapState,
    Participant, Position, TurnStatus, UserId,
};

pub fn empty_state() -> GameState {
    GameState {
        interaction_id: InteractionId::new("int-1"),
        status: InteractionStatus::Waiting,
        initiative_order: Vec::new(),
        current_turn_index: 0,
        round_number: 1,
        participants: Vec::new(),
        map_state: MapState {
            width: 20,
            height: 20,
            entities: Vec::new(),
            obstacles: Vec::new(),
            terrain: Vec::new(),
        },
        turn_history: Vec::new(),
        chat_log: Vec::new(),
        timestamp: Utc::now(),
    }
}

pub fn active_participant(entity_id: &str) -> Participant {
    Participant {
        entity_id: EntityId::new(entity_id),
        entity_type: EntityType::PlayerCharacter,
        user_id: UserId::new(format!("user-{entity_id}")),
        is_dm: false,
        current_hp: 10,
        max_hp: 10,
        position: Position::new(0, 0),
        movement_speed: 6,
        conditions: Vec::new(),
        inventory: Inventory { items: Vec::new(), equipped: Vec::new(), capacity: 10 },
        available_actions: vec!["move".into(), "attack".into(), "end".into()],
        turn_status: TurnStatus::Waiting,
    }
}
