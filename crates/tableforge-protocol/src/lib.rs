//! Wire protocol and data model for the live interaction server.
//!
//! This crate defines the "language" every other component speaks:
//!
//! - **Identifiers** ([`EntityId`], [`InteractionId`], [`UserId`], ...).
//! - **Data model** ([`GameState`], [`Participant`], [`MapState`], ...).
//! - **Actions** ([`TurnAction`], [`ValidationResult`]).
//! - **Deltas and events** ([`StateDelta`], [`GameEvent`], [`Snapshot`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]).
//! - **Errors** ([`ProtocolError`], [`ApiError`]).
//!
//! It doesn't know about connections, rooms, or persistence — only how to
//! represent and serialize the state those components operate on.

mod action;
mod codec;
mod delta;
mod error;
mod event;
mod ids;
mod model;

pub use action::{ActionType, DamageParams, TurnAction, ValidationResult};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use delta::{DeltaKind, Snapshot, StateDelta, DEFAULT_SNAPSHOT_CAPACITY};
pub use error::{ApiError, ProtocolError};
pub use event::GameEvent;
pub use ids::{EntityId, InteractionId, ItemId, RoomId, SessionId, SpellId, UserId};
pub use model::{
    ChatChannel, ChatMessage, EntityType, GameState, InitiativeEntry, Inventory, InventoryItem,
    InteractionStatus, MapState, Obstacle, Participant, Position, TerrainTile, TurnRecord,
    TurnRecordStatus, TurnStatus, sort_initiative,
};
