//! Room and Room Manager: the actor that owns a single interaction's
//! authoritative state, and the directory that creates, routes to, and
//! retires rooms.

mod config;
mod error;
mod manager;
mod room;

pub use config::{ManagerConfig, RoomConfig};
pub use error::RoomError;
pub use manager::{ManagerEvent, RoomManager};
pub use room::{RoomHandle, RoomInfo, RoomMember};
