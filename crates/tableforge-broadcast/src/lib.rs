//! Event broadcaster: per-interaction event fan-out, visibility filtering,
//! and batching.
//!
//! Rooms never write to a transport directly — they hand events to a
//! [`Broadcaster`], which owns the per-interaction subscriber registry and
//! delivers at-most-once, in order, per subscriber. Batching
//! ([`spawn_batcher`]) is an optional layer on top: a connection handler
//! may wrap a subscriber's raw receiver in a batcher before forwarding to
//! the transport, coalescing bursts of events into fewer wire frames.

mod batch;
mod broadcaster;
mod error;

pub use batch::{spawn_batcher, BatchConfig};
pub use broadcaster::Broadcaster;
pub use error::BroadcastError;
