//! # Tableforge
//!
//! The realtime coordination backend for a multi-user tabletop-RPG session:
//! joining an interaction, taking turns, pausing/resuming play, chatting,
//! and recovering from a bad state transition, all delivered over a single
//! WebSocket connection per client.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tableforge::TableforgeServer;
//! use tableforge_persistence::InMemoryPersistence;
//! use tableforge_session::{Authenticator, Identity, SessionError};
//! use tableforge_protocol::{SessionId, UserId};
//! use std::sync::Arc;
//!
//! struct DevAuthenticator;
//!
//! impl Authenticator for DevAuthenticator {
//!     async fn authenticate(&self, credential: &str) -> Result<Identity, SessionError> {
//!         Ok(Identity {
//!             user_id: UserId::new(credential),
//!             session_id: SessionId::new(format!("sess-{credential}")),
//!             org_id: None,
//!         })
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let server = TableforgeServer::builder()
//!     .bind("0.0.0.0:3001")
//!     .build(DevAuthenticator, Arc::new(InMemoryPersistence::new()))
//!     .await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod health;
mod message;
mod server;

pub use error::ServerError;
pub use message::{ClientRequest, ServerResponse, ServerStats, ServiceStatus};
pub use server::{TableforgeServer, TableforgeServerBuilder};
