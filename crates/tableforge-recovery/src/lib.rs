//! Error classification, recovery strategy selection, and the snapshot
//! ring rooms roll back to.

mod classify;
mod error;
mod snapshot_ring;

pub use classify::{default_strategy, escalate, ErrorKind, RecoveryStrategy};
pub use error::RecoveryError;
pub use snapshot_ring::SnapshotRing;
