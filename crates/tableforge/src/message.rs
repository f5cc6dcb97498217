//! The wire-level request/response and event types exchanged over a
//! connection, once the handshake has resolved an identity.
//!
//! Framing is left to the transport (currently WebSocket binary frames,
//! JSON-encoded); this module only defines the typed payloads.

use serde::{Deserialize, Serialize};
use tableforge_protocol::{
    ChatChannel, ChatMessage, EntityId, EntityType, GameEvent, GameState, InteractionId,
    TurnAction, UserId, ValidationResult,
};

/// Every request a connected client may send, once authenticated.
///
/// `Handshake` is the one exception — it precedes authentication and is
/// handled before the rest of this enum is ever parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClientRequest {
    Handshake { token: String },
    Health,
    JoinRoom {
        interaction_id: InteractionId,
        entity_id: EntityId,
        entity_type: EntityType,
        #[serde(default)]
        is_dm: bool,
    },
    LeaveRoom { interaction_id: InteractionId },
    PauseInteraction { interaction_id: InteractionId, reason: Option<String> },
    ResumeInteraction { interaction_id: InteractionId },
    TakeTurn { interaction_id: InteractionId, action: TurnAction },
    SkipTurn { interaction_id: InteractionId, reason: Option<String> },
    BacktrackTurn { interaction_id: InteractionId, turn_number: u32, reason: Option<String> },
    GetRoomState { interaction_id: InteractionId },
    SendChatMessage {
        interaction_id: InteractionId,
        content: String,
        channel: ChatChannel,
        recipients: Option<Vec<UserId>>,
    },
    GetChatHistory {
        interaction_id: InteractionId,
        channel: Option<ChatChannel>,
        limit: Option<usize>,
    },
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub persistence: bool,
    pub websocket: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub active_rooms: usize,
    pub total_participants: usize,
}

/// Every response or out-of-band event a connection may receive.
///
/// `Event` carries broadcast `GameEvent`s flowing from the room the
/// connection has joined; every other variant is a direct reply to a
/// `ClientRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerResponse {
    HandshakeAck { user_id: UserId },
    Health { status: String, uptime_secs: u64, services: ServiceStatus, stats: ServerStats },
    JoinedRoom { success: bool, room_id: InteractionId, game_state: GameState, participant_count: usize },
    Left { success: bool, message: String },
    Paused { success: bool },
    Resumed { success: bool },
    TurnResult { success: bool, result: ValidationResult, game_state: GameState },
    Skipped { success: bool },
    Backtracked { success: bool },
    RoomState { game_state: GameState },
    ChatSent { success: bool },
    ChatHistory { messages: Vec<ChatMessage> },
    HeartbeatAck,
    Event(GameEvent),
    Error { code: String, message: String },
}
