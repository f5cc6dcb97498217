//! State persistence gateway: read-through on room creation, and durable
//! writes of completion records and snapshots, against an opaque
//! key-addressable document store.

mod error;
mod gateway;
mod http;
mod memory;

pub use error::PersistenceError;
pub use gateway::PersistenceGateway;
pub use http::HttpPersistence;
pub use memory::InMemoryPersistence;
