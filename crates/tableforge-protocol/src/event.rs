//! The event taxonomy broadcast to subscribers of an interaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delta::StateDelta;
use crate::ids::{EntityId, InteractionId, UserId};
use crate::model::{ChatMessage, InitiativeEntry, TurnRecord};

/// Every event a room can emit to its subscribers. Tagged so clients can
/// match exhaustively on `type` without guessing at payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    ParticipantJoined { interaction_id: InteractionId, entity_id: EntityId },
    ParticipantLeft { interaction_id: InteractionId, entity_id: EntityId },
    TurnStarted { interaction_id: InteractionId, entity_id: EntityId, round_number: u32 },
    TurnCompleted { interaction_id: InteractionId, record: TurnRecord },
    TurnSkipped { interaction_id: InteractionId, entity_id: EntityId, reason: String },
    TurnBacktracked { interaction_id: InteractionId, to_turn_number: u32 },
    InitiativeUpdated { interaction_id: InteractionId, order: Vec<InitiativeEntry> },
    StateDeltaEvent { delta: StateDelta },
    ChatMessageEvent { interaction_id: InteractionId, message: ChatMessage },
    InteractionPaused { interaction_id: InteractionId, reason: String },
    InteractionResumed { interaction_id: InteractionId },
    InteractionCompleted { interaction_id: InteractionId },
    PlayerDisconnected { interaction_id: InteractionId, user_id: UserId, is_dm: bool },
    PlayerReconnected { interaction_id: InteractionId, user_id: UserId, is_dm: bool },
    Error { interaction_id: InteractionId, code: String, message: String, at: DateTime<Utc> },
}

impl GameEvent {
    pub fn interaction_id(&self) -> &InteractionId {
        match self {
            GameEvent::ParticipantJoined { interaction_id, .. }
            | GameEvent::ParticipantLeft { interaction_id, .. }
            | GameEvent::TurnStarted { interaction_id, .. }
            | GameEvent::TurnCompleted { interaction_id, .. }
            | GameEvent::TurnSkipped { interaction_id, .. }
            | GameEvent::TurnBacktracked { interaction_id, .. }
            | GameEvent::InitiativeUpdated { interaction_id, .. }
            | GameEvent::ChatMessageEvent { interaction_id, .. }
            | GameEvent::InteractionPaused { interaction_id, .. }
            | GameEvent::InteractionResumed { interaction_id }
            | GameEvent::InteractionCompleted { interaction_id }
            | GameEvent::PlayerDisconnected { interaction_id, .. }
            | GameEvent::PlayerReconnected { interaction_id, .. }
            | GameEvent::Error { interaction_id, .. } => interaction_id,
            GameEvent::StateDeltaEvent { delta } => &delta.interaction_id,
        }
    }

    /// Whether this event is visible to a given user. DM-only chat and
    /// private chat deltas are filtered out for everyone else; everything
    /// else is party-visible.
    pub fn visible_to(&self, user_id: &UserId, is_dm: bool) -> bool {
        match self {
            GameEvent::ChatMessageEvent { message, .. } => match message.channel {
                crate::model::ChatChannel::Dm => is_dm,
                crate::model::ChatChannel::Private => {
                    message.recipients.as_ref().is_none_or(|r| r.contains(user_id))
                        || message.user_id.as_ref() == Some(user_id)
                }
                crate::model::ChatChannel::Party | crate::model::ChatChannel::System => true,
            },
            _ => true,
        }
    }
}
