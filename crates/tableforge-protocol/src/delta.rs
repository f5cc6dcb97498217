//! State deltas broadcast to subscribers, and the snapshot ring used for
//! error recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::InteractionId;
use crate::model::{ChatMessage, GameState, InitiativeEntry, Participant, TurnRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeltaKind {
    Participant { participant: Participant },
    Turn { record: TurnRecord },
    Map { entity_positions: Vec<(crate::ids::EntityId, crate::model::Position)> },
    Initiative { order: Vec<InitiativeEntry> },
    Chat { message: ChatMessage },
    /// Full-state resync, used on reconnect or after a recovery rollback.
    FullSync { state: Box<GameState> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDelta {
    pub interaction_id: InteractionId,
    pub full_sync: bool,
    pub kind: DeltaKind,
    pub timestamp: DateTime<Utc>,
}

impl StateDelta {
    pub fn full_sync(interaction_id: InteractionId, state: GameState, timestamp: DateTime<Utc>) -> Self {
        Self {
            interaction_id,
            full_sync: true,
            kind: DeltaKind::FullSync { state: Box::new(state) },
            timestamp,
        }
    }

    pub fn partial(
        interaction_id: InteractionId,
        kind: DeltaKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { interaction_id, full_sync: false, kind, timestamp }
    }
}

/// A point-in-time copy of a room's state, kept in a bounded ring by the
/// error recovery component. Default capacity is 10 per interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: GameState,
    pub taken_at: DateTime<Utc>,
}

pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 10;
