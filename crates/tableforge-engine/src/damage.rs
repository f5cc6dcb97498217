//! Pluggable damage resolution.
//!
//! The engine validates that damage parameters are well-formed but never
//! computes rule-correct damage itself — that's rules-system-specific math
//! this workspace deliberately stays out of. Implement [`DamageResolver`]
//! with your own system's dice/modifier logic; [`DefaultDamageResolver`]
//! just passes through the amount the client supplied, which is enough for
//! development and for systems where damage is pre-rolled client-side.

use tableforge_protocol::{GameState, TurnAction};

pub trait DamageResolver: Send + Sync + 'static {
    fn resolve_damage(&self, state: &GameState, action: &TurnAction) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDamageResolver;

impl DamageResolver for DefaultDamageResolver {
    fn resolve_damage(&self, _state: &GameState, action: &TurnAction) -> i64 {
        action.damage.as_ref().map(|d| d.amount).unwrap_or(0)
    }
}
