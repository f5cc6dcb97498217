//! Turn actions submitted by clients and the result of validating them.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, ItemId, SpellId};
use crate::model::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Move,
    Attack,
    Cast,
    UseItem,
    Interact,
    End,
}

/// A single damage instance attached to an attack/cast action. The engine
/// does not compute the amount itself — that is delegated to a
/// `DamageResolver` — but it does validate that the parameters are
/// well-formed before dispatching to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageParams {
    pub amount: i64,
    pub damage_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnAction {
    pub entity_id: EntityId,
    pub action_type: ActionType,
    pub position: Option<Position>,
    pub target_entity_id: Option<EntityId>,
    pub item_id: Option<ItemId>,
    pub spell_id: Option<SpellId>,
    pub damage: Option<DamageParams>,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, errors: Vec::new() }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self { valid: false, errors: vec![reason.into()] }
    }

    pub fn merge(mut self, other: ValidationResult) -> Self {
        if !other.valid {
            self.valid = false;
            self.errors.extend(other.errors);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_ok_has_no_errors() {
        let result = ValidationResult::ok();
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validation_result_reject_carries_reason() {
        let result = ValidationResult::reject("not your turn");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["not your turn".to_string()]);
    }

    #[test]
    fn test_validation_result_merge_accumulates_errors() {
        let a = ValidationResult::reject("bad target");
        let b = ValidationResult::reject("bad position");
        let merged = a.merge(b);
        assert!(!merged.valid);
        assert_eq!(merged.errors.len(), 2);
    }
}
