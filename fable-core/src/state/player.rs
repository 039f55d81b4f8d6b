//! Player-domain state manager.
//!
//! Governs the player character: health, mana, the alive flag, position,
//! carried items, and clamped attributes. Health crossing zero is a valid
//! operation that carries an `alive=false` side effect; spending mana the
//! player does not have is refused outright.

use super::{
    numeric_apply, numeric_next, split_path, StateError, StateManager, StateOperation,
    StateOperationRequest, StateValidationResult,
};
use crate::outcome::StateChange;
use crate::world::GameWorld;
use serde_json::{json, Value};

/// Canonical target name recorded in player state changes.
pub const PLAYER_TARGET: &str = "player";

#[derive(Debug, Default, Clone, Copy)]
pub struct PlayerManager;

impl PlayerManager {
    fn change(request: &StateOperationRequest, old: Value, new: Value) -> StateChange {
        StateChange::new(
            PLAYER_TARGET,
            request.property.clone(),
            request.operation,
            old,
            new,
            request.reason.clone(),
        )
    }
}

impl StateManager for PlayerManager {
    fn supports_target(&self, world: &GameWorld, target: &str) -> bool {
        target.eq_ignore_ascii_case(PLAYER_TARGET)
            || target.eq_ignore_ascii_case("self")
            || target.eq_ignore_ascii_case(&world.player.name)
    }

    fn can_perform(
        &self,
        world: &GameWorld,
        request: &StateOperationRequest,
    ) -> StateValidationResult {
        let player = &world.player;
        let path = request.property.as_str();

        if !player.alive && path != "alive" {
            return StateValidationResult::rejected(format!("{} is dead", player.name));
        }

        match split_path(path) {
            ("hp", None) => match numeric_next(request, player.hp) {
                Err(rejection) => rejection,
                Ok(next) if next <= 0 && player.alive => {
                    StateValidationResult::ok().with_side_effect(StateOperationRequest::set(
                        PLAYER_TARGET,
                        "alive",
                        json!(false),
                        "hp fell to zero",
                    ))
                }
                Ok(_) => StateValidationResult::ok(),
            },
            ("mp", None) => match numeric_next(request, player.mp) {
                Err(rejection) => rejection,
                Ok(next) if next < 0 => StateValidationResult::rejected(format!(
                    "insufficient mana: {} available",
                    player.mp
                )),
                Ok(_) => StateValidationResult::ok(),
            },
            ("alive", None) => {
                if request.operation == StateOperation::Set && request.value.is_boolean() {
                    StateValidationResult::ok()
                } else {
                    StateValidationResult::rejected("alive only accepts set true/false")
                }
            }
            ("location", None) => match (request.operation, request.value.as_str()) {
                (StateOperation::Set, Some(dest)) if world.locations.contains_key(dest) => {
                    StateValidationResult::ok()
                }
                (StateOperation::Set, Some(dest)) => {
                    StateValidationResult::rejected(format!("unknown location: {dest}"))
                }
                _ => StateValidationResult::rejected("location only accepts set <location id>"),
            },
            ("inventory", None) => match request.operation {
                StateOperation::Append => {
                    if request.value.as_str().is_none() {
                        StateValidationResult::rejected("inventory expects an item name")
                    } else if player.inventory.is_full() {
                        StateValidationResult::rejected(format!(
                            "inventory is full ({} slots)",
                            player.inventory.capacity
                        ))
                    } else {
                        StateValidationResult::ok()
                    }
                }
                StateOperation::Remove => match request.value.as_str() {
                    Some(item) if player.inventory.contains(item) => StateValidationResult::ok(),
                    Some(item) => {
                        StateValidationResult::rejected(format!("not carrying {item}"))
                    }
                    None => StateValidationResult::rejected("inventory expects an item name"),
                },
                _ => StateValidationResult::rejected("inventory only accepts append/remove"),
            },
            ("attributes", Some(attr)) => match player.attributes.get(attr) {
                Some(def) => match numeric_next(request, def.value) {
                    Err(rejection) => rejection,
                    Ok(_) => StateValidationResult::ok(),
                },
                None => StateValidationResult::rejected(format!("unknown attribute: {attr}")),
            },
            _ => StateValidationResult::rejected(format!("unknown player property: {path}")),
        }
    }

    fn apply(
        &self,
        world: &mut GameWorld,
        request: &StateOperationRequest,
    ) -> Result<StateChange, StateError> {
        let path = request.property.as_str();
        match split_path(path) {
            ("hp", None) => {
                let old = world.player.hp;
                let next = numeric_apply(request, old, PLAYER_TARGET)?;
                world.player.hp = next.clamp(0, world.player.max_hp);
                Ok(Self::change(request, json!(old), json!(world.player.hp)))
            }
            ("mp", None) => {
                let old = world.player.mp;
                let next = numeric_apply(request, old, PLAYER_TARGET)?;
                world.player.mp = next.clamp(0, world.player.max_mp);
                Ok(Self::change(request, json!(old), json!(world.player.mp)))
            }
            ("alive", None) => {
                let flag = request
                    .value
                    .as_bool()
                    .ok_or_else(|| StateError::WrongValueType {
                        expected: "boolean",
                        target: PLAYER_TARGET.to_string(),
                        property: request.property.clone(),
                    })?;
                let old = world.player.alive;
                world.player.alive = flag;
                Ok(Self::change(request, json!(old), json!(flag)))
            }
            ("location", None) => {
                let dest = request
                    .value
                    .as_str()
                    .ok_or_else(|| StateError::WrongValueType {
                        expected: "string",
                        target: PLAYER_TARGET.to_string(),
                        property: request.property.clone(),
                    })?;
                let old = world.player.location.clone();
                world.player.location = dest.to_string();
                Ok(Self::change(request, json!(old), json!(dest)))
            }
            ("inventory", None) => {
                let item = request
                    .value
                    .as_str()
                    .ok_or_else(|| StateError::WrongValueType {
                        expected: "string",
                        target: PLAYER_TARGET.to_string(),
                        property: request.property.clone(),
                    })?;
                let old = json!(world.player.inventory.items);
                match request.operation {
                    StateOperation::Append => {
                        world.player.inventory.items.push(item.to_string());
                    }
                    StateOperation::Remove => {
                        let pos = world.player.inventory.position_of(item).ok_or_else(|| {
                            StateError::MissingItem {
                                target: PLAYER_TARGET.to_string(),
                                item: item.to_string(),
                            }
                        })?;
                        world.player.inventory.items.remove(pos);
                    }
                    _ => {
                        return Err(StateError::InvalidOperation {
                            operation: request.operation,
                            target: PLAYER_TARGET.to_string(),
                            property: request.property.clone(),
                        })
                    }
                }
                Ok(Self::change(
                    request,
                    old,
                    json!(world.player.inventory.items),
                ))
            }
            ("attributes", Some(attr)) => {
                let def = world.player.attributes.get_mut(attr).ok_or_else(|| {
                    StateError::UnknownProperty {
                        target: PLAYER_TARGET.to_string(),
                        property: request.property.clone(),
                    }
                })?;
                let old = def.value;
                let next = numeric_apply(request, old, PLAYER_TARGET)?;
                def.value = def.clamp(next);
                Ok(Self::change(request, json!(old), json!(def.value)))
            }
            _ => Err(StateError::UnknownProperty {
                target: PLAYER_TARGET.to_string(),
                property: request.property.clone(),
            }),
        }
    }

    fn current_value(&self, world: &GameWorld, _target: &str, property: &str) -> Option<Value> {
        let player = &world.player;
        match split_path(property) {
            ("name", None) => Some(json!(player.name)),
            ("hp", None) => Some(json!(player.hp)),
            ("max_hp", None) => Some(json!(player.max_hp)),
            ("mp", None) => Some(json!(player.mp)),
            ("max_mp", None) => Some(json!(player.max_mp)),
            ("alive", None) => Some(json!(player.alive)),
            ("location", None) => Some(json!(player.location)),
            ("inventory", None) => Some(json!(player.inventory.items)),
            ("attributes", Some(attr)) => player.attributes.get(attr).map(|d| json!(d.value)),
            _ => None,
        }
    }
}
