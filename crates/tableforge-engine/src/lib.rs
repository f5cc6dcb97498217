//! Game state engine: turn action validation, application, and initiative
//! tracking.
//!
//! The room owns the authoritative `GameState` and drives the turn cycle;
//! this crate supplies the pure computation that cycle depends on:
//!
//! - [`validate`] — can this action be taken right now?
//! - [`apply`] — apply an already-validated action, returning the delta.
//! - [`advance_turn`] — move initiative forward, recording a `TurnRecord`.
//! - [`rebuild_initiative`] — recompute ordering after join/leave.
//!
//! Damage math is delegated to the pluggable [`DamageResolver`] trait so
//! this crate never encodes any particular rules system.

mod damage;
mod error;
mod logic;

#[cfg(test)]
mod tests_support;

pub use damage::{DamageResolver, DefaultDamageResolver};
pub use error::EngineError;
pub use logic::{advance_turn, apply, check_invariants, rebuild_initiative, validate};
