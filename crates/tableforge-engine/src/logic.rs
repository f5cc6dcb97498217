//! Validation and application of turn actions against a `GameState`.
//!
//! Both functions are pure: they take a state and an action and return a
//! result without any I/O or hidden mutation of globals. The room owns the
//! actual `GameState` and is responsible for calling `validate` before
//! `apply`, persisting the result, and broadcasting the resulting delta.

use tableforge_protocol::{
    ActionType, DeltaKind, GameState, InteractionStatus, Participant, StateDelta, TurnAction,
    TurnRecord, TurnRecordStatus, ValidationResult,
};

use crate::damage::DamageResolver;

pub fn validate(state: &GameState, action: &TurnAction) -> ValidationResult {
    if state.status != InteractionStatus::Active {
        return ValidationResult::reject("interaction is not active");
    }

    let Some(current_id) = state.current_entity_id() else {
        return ValidationResult::reject("no active turn");
    };
    if current_id != &action.entity_id {
        return ValidationResult::reject("not this entity's turn");
    }

    let Some(participant) = state.participant(&action.entity_id) else {
        return ValidationResult::reject("entity is not a participant");
    };

    let action_key = action_type_key(action.action_type);
    if action.action_type != ActionType::End
        && !participant.available_actions.iter().any(|a| a == action_key)
    {
        return ValidationResult::reject(format!("action {action_key} not available"));
    }

    match action.action_type {
        ActionType::Move => validate_move(state, participant, action),
        ActionType::Attack | ActionType::Cast => validate_targeted(state, action),
        ActionType::UseItem => validate_use_item(participant, action),
        ActionType::Interact | ActionType::End => ValidationResult::ok(),
    }
}

fn validate_move(state: &GameState, participant: &Participant, action: &TurnAction) -> ValidationResult {
    let Some(target) = action.position else {
        return ValidationResult::reject("move requires a target position");
    };
    if !state.map_state.in_bounds(&target) {
        return ValidationResult::reject("target position is out of bounds");
    }
    if state.map_state.is_obstructed(&target) {
        return ValidationResult::reject("target position is obstructed");
    }
    let distance = participant.position.chebyshev_distance(&target);
    if distance > participant.movement_speed {
        return ValidationResult::reject("target position exceeds movement speed");
    }
    ValidationResult::ok()
}

fn validate_targeted(state: &GameState, action: &TurnAction) -> ValidationResult {
    if action.action_type == tableforge_protocol::ActionType::Cast && action.spell_id.is_none() {
        return ValidationResult::reject("cast requires a spell id");
    }
    let Some(target_id) = &action.target_entity_id else {
        return ValidationResult::reject("action requires a target");
    };
    if state.participant(target_id).is_none() {
        return ValidationResult::reject("target entity does not exist");
    }
    if let Some(damage) = &action.damage {
        if damage.damage_type.is_empty() {
            return ValidationResult::reject("damage type must not be empty");
        }
    }
    ValidationResult::ok()
}

fn validate_use_item(participant: &Participant, action: &TurnAction) -> ValidationResult {
    let Some(item_id) = &action.item_id else {
        return ValidationResult::reject("useItem requires an item id");
    };
    if !participant.inventory.has_item(item_id) {
        return ValidationResult::reject("item not found in inventory");
    }
    ValidationResult::ok()
}

fn action_type_key(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Move => "move",
        ActionType::Attack => "attack",
        ActionType::Cast => "cast",
        ActionType::UseItem => "useItem",
        ActionType::Interact => "interact",
        ActionType::End => "end",
    }
}

/// Applies an already-validated action, returning the resulting delta.
/// Callers must call [`validate`] first; `apply` does not re-validate.
pub fn apply(
    state: &mut GameState,
    action: &TurnAction,
    resolver: &dyn DamageResolver,
) -> StateDelta {
    let timestamp = state.timestamp;
    match action.action_type {
        ActionType::Move => {
            let target = action.position.expect("validated");
            state.map_state.set_entity_position(&action.entity_id, target);
            if let Some(p) = state.participant_mut(&action.entity_id) {
                p.position = target;
            }
            StateDelta::partial(
                state.interaction_id.clone(),
                DeltaKind::Map { entity_positions: state.map_state.entities.clone() },
                timestamp,
            )
        }
        ActionType::Attack | ActionType::Cast => {
            let damage = resolver.resolve_damage(state, action);
            let target_id = action.target_entity_id.clone().expect("validated");
            if let Some(target) = state.participant_mut(&target_id) {
                target.current_hp -= damage;
                target.clamp_hp();
            }
            let participant = state.participant(&target_id).cloned().expect("just updated");
            StateDelta::partial(
                state.interaction_id.clone(),
                DeltaKind::Participant { participant },
                timestamp,
            )
        }
        ActionType::UseItem => {
            let item_id = action.item_id.clone().expect("validated");
            if let Some(p) = state.participant_mut(&action.entity_id) {
                if let Some(entry) = p.inventory.items.iter_mut().find(|i| i.item_id == item_id) {
                    entry.quantity = entry.quantity.saturating_sub(1);
                }
                p.inventory.items.retain(|i| i.quantity > 0);
            }
            let participant = state.participant(&action.entity_id).cloned().expect("just updated");
            StateDelta::partial(
                state.interaction_id.clone(),
                DeltaKind::Participant { participant },
                timestamp,
            )
        }
        ActionType::Interact => {
            let participant = state.participant(&action.entity_id).cloned().expect("validated");
            StateDelta::partial(
                state.interaction_id.clone(),
                DeltaKind::Participant { participant },
                timestamp,
            )
        }
        ActionType::End => {
            let record = advance_turn(state, TurnRecordStatus::Completed);
            tracing::debug!(entity_id = %record.entity_id, round = record.round_number, "turn completed");
            StateDelta::partial(
                state.interaction_id.clone(),
                DeltaKind::Turn { record },
                timestamp,
            )
        }
    }
}

/// Advances to the next entity in initiative order, recording the turn
/// that just ended and rolling `round_number` over when initiative wraps.
pub fn advance_turn(state: &mut GameState, status: TurnRecordStatus) -> TurnRecord {
    let finished_entity = state.current_entity_id().cloned();
    let turn_number = state.turn_history.len() as u32 + 1;
    let round_number = state.round_number;

    let record = TurnRecord {
        entity_id: finished_entity.clone().unwrap_or_else(|| tableforge_protocol::EntityId::new("")),
        turn_number,
        round_number,
        actions: Vec::new(),
        start_time: state.timestamp,
        end_time: Some(state.timestamp),
        status,
    };
    state.turn_history.push(record.clone());

    if let Some(entity_id) = &finished_entity {
        if let Some(p) = state.participant_mut(entity_id) {
            p.turn_status = match status {
                TurnRecordStatus::Completed => tableforge_protocol::TurnStatus::Completed,
                TurnRecordStatus::Skipped | TurnRecordStatus::Timeout => {
                    tableforge_protocol::TurnStatus::Skipped
                }
            };
        }
    }

    if !state.initiative_order.is_empty() {
        let next_index = (state.current_turn_index + 1) % state.initiative_order.len();
        if next_index == 0 {
            state.round_number += 1;
        }
        state.current_turn_index = next_index;
        let next_entity = state.initiative_order[next_index].entity_id.clone();
        if let Some(p) = state.participant_mut(&next_entity) {
            p.turn_status = tableforge_protocol::TurnStatus::Active;
        }
    }

    record
}

/// Checks the invariants documented on `GameState` that the engine itself
/// is responsible for preserving. Called by the room after applying a turn
/// action, so a corrupted result can be rolled back before it's broadcast.
pub fn check_invariants(state: &GameState) -> Result<(), String> {
    if state.initiative_order.is_empty() {
        if state.current_turn_index != 0 {
            return Err("current_turn_index must be 0 when initiative_order is empty".to_string());
        }
    } else if state.current_turn_index >= state.initiative_order.len() {
        return Err("current_turn_index out of bounds for initiative_order".to_string());
    }

    let active_turns = state
        .participants
        .iter()
        .filter(|p| p.turn_status == tableforge_protocol::TurnStatus::Active)
        .count();
    if active_turns > 1 {
        return Err(format!("{active_turns} participants have an active turn_status, expected at most one"));
    }

    if state.round_number == 0 {
        return Err("round_number must be >= 1".to_string());
    }

    Ok(())
}

/// Rebuilds initiative ordering after a participant joins or leaves.
/// `entries` is the full, authoritative set of initiative entries for
/// every current participant — the caller is responsible for carrying
/// over existing rolls and supplying a fresh one for anyone new.
pub fn rebuild_initiative(
    state: &mut GameState,
    mut entries: Vec<tableforge_protocol::InitiativeEntry>,
) {
    tableforge_protocol::sort_initiative(&mut entries);
    let current_entity = state.current_entity_id().cloned();
    state.initiative_order = entries;
    state.current_turn_index = current_entity
        .and_then(|id| state.initiative_order.iter().position(|e| e.entity_id == id))
        .unwrap_or(0);
}
