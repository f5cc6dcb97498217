//! Core data model: participants, map state, turns, chat, and the aggregate
//! `GameState` that a room owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, InteractionId, ItemId, UserId};

/// A grid position. Both axes are non-negative per the map's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance: diagonal movement counts as a single step, same
    /// as most tabletop grid-movement rules.
    pub fn chebyshev_distance(&self, other: &Position) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    PlayerCharacter,
    Npc,
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnStatus {
    Waiting,
    Active,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item_id: ItemId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub items: Vec<InventoryItem>,
    pub equipped: Vec<ItemId>,
    pub capacity: u32,
}

impl Inventory {
    pub fn len(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn has_item(&self, item_id: &ItemId) -> bool {
        self.items.iter().any(|i| &i.item_id == item_id && i.quantity > 0)
    }
}

/// A participant in the interaction: a player character, NPC, or monster.
///
/// `is_dm` is an explicit role bit rather than something derived from
/// `entity_type` — a participant with `entity_type == Npc` or `Monster` is
/// not necessarily DM-controlled, and deriving DM status from entity type
/// conflates "who plays this" with "what this is".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub user_id: UserId,
    pub is_dm: bool,
    pub current_hp: i64,
    pub max_hp: i64,
    pub position: Position,
    pub movement_speed: u32,
    pub conditions: Vec<String>,
    pub inventory: Inventory,
    pub available_actions: Vec<String>,
    pub turn_status: TurnStatus,
}

impl Participant {
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    pub fn clamp_hp(&mut self) {
        self.current_hp = self.current_hp.clamp(0, self.max_hp);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeEntry {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub initiative: i32,
    pub user_id: Option<UserId>,
}

/// Sorts entries by initiative descending, breaking ties by entity id
/// lexically ascending so ordering is stable and reproducible.
pub fn sort_initiative(entries: &mut [InitiativeEntry]) {
    entries.sort_by(|a, b| {
        b.initiative
            .cmp(&a.initiative)
            .then_with(|| a.entity_id.as_str().cmp(b.entity_id.as_str()))
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainTile {
    pub position: Position,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    pub width: u32,
    pub height: u32,
    pub entities: Vec<(EntityId, Position)>,
    pub obstacles: Vec<Obstacle>,
    pub terrain: Vec<TerrainTile>,
}

impl MapState {
    pub fn in_bounds(&self, pos: &Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn is_obstructed(&self, pos: &Position) -> bool {
        self.obstacles.iter().any(|o| o.position == *pos)
    }

    pub fn entity_position(&self, entity_id: &EntityId) -> Option<Position> {
        self.entities
            .iter()
            .find(|(id, _)| id == entity_id)
            .map(|(_, pos)| *pos)
    }

    pub fn set_entity_position(&mut self, entity_id: &EntityId, pos: Position) {
        if let Some(entry) = self.entities.iter_mut().find(|(id, _)| id == entity_id) {
            entry.1 = pos;
        } else {
            self.entities.push((entity_id.clone(), pos));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnRecordStatus {
    Completed,
    Skipped,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    pub entity_id: EntityId,
    pub turn_number: u32,
    pub round_number: u32,
    pub actions: Vec<serde_json::Value>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TurnRecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatChannel {
    Party,
    Dm,
    Private,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: Option<UserId>,
    pub entity_id: Option<EntityId>,
    pub content: String,
    #[serde(rename = "type")]
    pub channel: ChatChannel,
    pub recipients: Option<Vec<UserId>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionStatus {
    Waiting,
    Active,
    Paused,
    Completed,
}

impl InteractionStatus {
    /// Whether `self -> next` is an allowed lifecycle transition.
    ///
    /// Unlike a strictly-linear state machine, `Active` and `Paused` form a
    /// cycle: a room can pause and resume any number of times before it
    /// completes.
    pub fn can_transition_to(self, next: InteractionStatus) -> bool {
        use InteractionStatus::*;
        matches!(
            (self, next),
            (Waiting, Active)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Completed)
                | (Paused, Completed)
        )
    }
}

/// Aggregate state for a single interaction (room).
///
/// Invariants (enforced by the engine and room, not by construction alone):
/// 1. `current_turn_index` is a valid index into `initiative_order`, or
///    `initiative_order` is empty and `current_turn_index` is 0.
/// 2. Exactly zero or one participant has `turn_status == Active` at a time.
/// 3. `round_number >= 1` and `turn_number` on any `TurnRecord` is `>= 1`.
/// 4. `timestamp` is monotonically non-decreasing across successive states
///    observed for the same interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub interaction_id: InteractionId,
    pub status: InteractionStatus,
    pub initiative_order: Vec<InitiativeEntry>,
    pub current_turn_index: usize,
    pub round_number: u32,
    pub participants: Vec<Participant>,
    pub map_state: MapState,
    pub turn_history: Vec<TurnRecord>,
    pub chat_log: Vec<ChatMessage>,
    pub timestamp: DateTime<Utc>,
}

impl GameState {
    pub fn participant(&self, entity_id: &EntityId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.entity_id == entity_id)
    }

    pub fn participant_mut(&mut self, entity_id: &EntityId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.entity_id == entity_id)
    }

    pub fn current_entity_id(&self) -> Option<&EntityId> {
        self.initiative_order
            .get(self.current_turn_index)
            .map(|entry| &entry.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: u32, y: u32) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn test_chebyshev_distance_counts_diagonal_as_one() {
        assert_eq!(pos(0, 0).chebyshev_distance(&pos(3, 3)), 3);
        assert_eq!(pos(0, 0).chebyshev_distance(&pos(3, 0)), 3);
        assert_eq!(pos(0, 0).chebyshev_distance(&pos(0, 0)), 0);
    }

    #[test]
    fn test_sort_initiative_breaks_ties_by_entity_id() {
        let mut entries = vec![
            InitiativeEntry {
                entity_id: EntityId::new("char-b"),
                entity_type: EntityType::PlayerCharacter,
                initiative: 15,
                user_id: None,
            },
            InitiativeEntry {
                entity_id: EntityId::new("char-a"),
                entity_type: EntityType::PlayerCharacter,
                initiative: 15,
                user_id: None,
            },
            InitiativeEntry {
                entity_id: EntityId::new("monster-1"),
                entity_type: EntityType::Monster,
                initiative: 20,
                user_id: None,
            },
        ];
        sort_initiative(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["monster-1", "char-a", "char-b"]);
    }

    #[test]
    fn test_interaction_status_allows_pause_resume_cycle() {
        assert!(InteractionStatus::Active.can_transition_to(InteractionStatus::Paused));
        assert!(InteractionStatus::Paused.can_transition_to(InteractionStatus::Active));
        assert!(!InteractionStatus::Waiting.can_transition_to(InteractionStatus::Completed));
    }

    #[test]
    fn test_map_state_set_entity_position_inserts_or_updates() {
        let mut map = MapState {
            width: 10,
            height: 10,
            entities: Vec::new(),
            obstacles: Vec::new(),
            terrain: Vec::new(),
        };
        let id = EntityId::new("char-a");
        map.set_entity_position(&id, pos(1, 1));
        assert_eq!(map.entity_position(&id), Some(pos(1, 1)));
        map.set_entity_position(&id, pos(2, 2));
        assert_eq!(map.entity_position(&id), Some(pos(2, 2)));
        assert_eq!(map.entities.len(), 1);
    }
}
