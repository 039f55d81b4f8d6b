//! NPC-domain state manager.
//!
//! Claims any known NPC by id or display name and records changes under the
//! canonical id. Damage past zero is allowed: the stored value clamps to 0
//! and an `alive=false` side effect cascades through the normal pipeline.
//! A dead NPC accepts no operation except on `alive` itself.

use super::{
    numeric_apply, numeric_next, split_path, StateError, StateManager, StateOperation,
    StateOperationRequest, StateValidationResult,
};
use crate::outcome::StateChange;
use crate::world::{GameWorld, NpcState};
use serde_json::{json, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct NpcManager;

impl NpcManager {
    /// Exact (case-insensitive) id or display-name lookup; fuzzy resolution
    /// is the actions' job, by the time a request reaches a manager the
    /// target is expected to be precise.
    fn resolve<'a>(world: &'a GameWorld, target: &str) -> Option<(&'a str, &'a NpcState)> {
        world
            .npcs
            .iter()
            .find(|(id, npc)| {
                id.eq_ignore_ascii_case(target) || npc.name.eq_ignore_ascii_case(target)
            })
            .map(|(id, npc)| (id.as_str(), npc))
    }

    fn change(
        id: &str,
        request: &StateOperationRequest,
        old: Value,
        new: Value,
    ) -> StateChange {
        StateChange::new(
            id,
            request.property.clone(),
            request.operation,
            old,
            new,
            request.reason.clone(),
        )
    }
}

impl StateManager for NpcManager {
    fn supports_target(&self, world: &GameWorld, target: &str) -> bool {
        Self::resolve(world, target).is_some()
    }

    fn can_perform(
        &self,
        world: &GameWorld,
        request: &StateOperationRequest,
    ) -> StateValidationResult {
        let Some((id, npc)) = Self::resolve(world, &request.target) else {
            return StateValidationResult::rejected(format!("unknown npc: {}", request.target));
        };
        let path = request.property.as_str();

        if !npc.alive && path != "alive" {
            return StateValidationResult::rejected(format!("{} is dead", npc.name));
        }

        match split_path(path) {
            ("hp", None) => match numeric_next(request, npc.hp) {
                Err(rejection) => rejection,
                Ok(next) if next <= 0 && npc.alive => {
                    StateValidationResult::ok().with_side_effect(StateOperationRequest::set(
                        id,
                        "alive",
                        json!(false),
                        format!("{} hp fell to zero", npc.name),
                    ))
                }
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
                StateOperation::Append if request.value.as_str().is_some() => {
                    StateValidationResult::ok()
                }
                StateOperation::Remove => match request.value.as_str() {
                    Some(item)
                        if npc
                            .inventory
                            .iter()
                            .any(|i| i.eq_ignore_ascii_case(item)) =>
                    {
                        StateValidationResult::ok()
                    }
                    Some(item) => StateValidationResult::rejected(format!(
                        "{} does not carry {item}",
                        npc.name
                    )),
                    None => StateValidationResult::rejected("inventory expects an item name"),
                },
                _ => StateValidationResult::rejected("inventory only accepts append/remove"),
            },
            _ => StateValidationResult::rejected(format!("unknown npc property: {path}")),
        }
    }

    fn apply(
        &self,
        world: &mut GameWorld,
        request: &StateOperationRequest,
    ) -> Result<StateChange, StateError> {
        let id = Self::resolve(world, &request.target)
            .map(|(id, _)| id.to_string())
            .ok_or_else(|| StateError::UnsupportedTarget(request.target.clone()))?;
        let npc = world
            .npcs
            .get_mut(&id)
            .ok_or_else(|| StateError::UnsupportedTarget(request.target.clone()))?;
        let path = request.property.as_str();

        match split_path(path) {
            ("hp", None) => {
                let old = npc.hp;
                let next = numeric_apply(request, old, &id)?;
                npc.hp = next.clamp(0, npc.max_hp);
                let new = npc.hp;
                Ok(Self::change(&id, request, json!(old), json!(new)))
            }
            ("alive", None) => {
                let flag = request
                    .value
                    .as_bool()
                    .ok_or_else(|| StateError::WrongValueType {
                        expected: "boolean",
                        target: id.clone(),
                        property: request.property.clone(),
                    })?;
                let old = npc.alive;
                npc.alive = flag;
                Ok(Self::change(&id, request, json!(old), json!(flag)))
            }
            ("location", None) => {
                let dest = request
                    .value
                    .as_str()
                    .ok_or_else(|| StateError::WrongValueType {
                        expected: "string",
                        target: id.clone(),
                        property: request.property.clone(),
                    })?;
                let old = npc.location.clone();
                npc.location = dest.to_string();
                Ok(Self::change(&id, request, json!(old), json!(dest)))
            }
            ("inventory", None) => {
                let item = request
                    .value
                    .as_str()
                    .ok_or_else(|| StateError::WrongValueType {
                        expected: "string",
                        target: id.clone(),
                        property: request.property.clone(),
                    })?;
                let old = json!(npc.inventory);
                match request.operation {
                    StateOperation::Append => npc.inventory.push(item.to_string()),
                    StateOperation::Remove => {
                        let pos = npc
                            .inventory
                            .iter()
                            .position(|i| i.eq_ignore_ascii_case(item))
                            .ok_or_else(|| StateError::MissingItem {
                                target: id.clone(),
                                item: item.to_string(),
                            })?;
                        npc.inventory.remove(pos);
                    }
                    _ => {
                        return Err(StateError::InvalidOperation {
                            operation: request.operation,
                            target: id.clone(),
                            property: request.property.clone(),
                        })
                    }
                }
                Ok(Self::change(&id, request, old, json!(npc.inventory)))
            }
            _ => Err(StateError::UnknownProperty {
                target: id,
                property: request.property.clone(),
            }),
        }
    }

    fn current_value(&self, world: &GameWorld, target: &str, property: &str) -> Option<Value> {
        let (_, npc) = Self::resolve(world, target)?;
        match split_path(property) {
            ("name", None) => Some(json!(npc.name)),
            ("hp", None) => Some(json!(npc.hp)),
            ("max_hp", None) => Some(json!(npc.max_hp)),
            ("alive", None) => Some(json!(npc.alive)),
            ("location", None) => Some(json!(npc.location)),
            ("role", None) => Some(json!(npc.role.as_str())),
            ("inventory", None) => Some(json!(npc.inventory)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Location, NpcRole, PlayerState};

    fn world() -> GameWorld {
        let mut world = GameWorld::new(PlayerState::new("Arin"));
        world.add_location("forest", Location::new("Forest"));
        world.add_npc(
            "goblin_01",
            NpcState::new("Forest Goblin", NpcRole::Monster)
                .with_hp(4, 10)
                .with_location("forest"),
        );
        world.add_npc(
            "mira",
            NpcState::new("Mira", NpcRole::Merchant).with_inventory(vec!["rope".into()]),
        );
        world
    }

    #[test]
    fn test_supports_id_and_name() {
        let world = world();
        assert!(NpcManager.supports_target(&world, "goblin_01"));
        assert!(NpcManager.supports_target(&world, "forest goblin"));
        assert!(!NpcManager.supports_target(&world, "gob"));
        assert!(!NpcManager.supports_target(&world, "player"));
    }

    #[test]
    fn test_hp_below_zero_allowed_with_side_effect() {
        let world = world();
        let hit = StateOperationRequest::subtract("goblin_01", "hp", json!(9), "smite");
        let verdict = NpcManager.can_perform(&world, &hit);
        assert!(verdict.valid);
        assert_eq!(verdict.side_effects.len(), 1);
        assert_eq!(verdict.side_effects[0].target, "goblin_01");
        assert_eq!(verdict.side_effects[0].property, "alive");
    }

    #[test]
    fn test_apply_clamps_hp_at_zero() {
        let mut world = world();
        let hit = StateOperationRequest::subtract("goblin_01", "hp", json!(9), "smite");
        let change = NpcManager.apply(&mut world, &hit).unwrap();
        assert_eq!(change.target, "goblin_01");
        assert_eq!(change.old_value, json!(4));
        assert_eq!(change.new_value, json!(0));
        assert_eq!(world.npcs["goblin_01"].hp, 0);
    }

    #[test]
    fn test_dead_npc_rejects_all_but_alive() {
        let mut world = world();
        world.npc_mut("goblin_01").unwrap().alive = false;

        let hit = StateOperationRequest::subtract("goblin_01", "hp", json!(1), "kick");
        let verdict = NpcManager.can_perform(&world, &hit);
        assert!(!verdict.valid);
        assert!(verdict.reason.unwrap().contains("dead"));

        let raise = StateOperationRequest::set("goblin_01", "alive", json!(true), "necromancy");
        assert!(NpcManager.can_perform(&world, &raise).valid);
    }

    #[test]
    fn test_change_uses_canonical_id_for_name_target() {
        let mut world = world();
        let hit = StateOperationRequest::subtract("Forest Goblin", "hp", json!(1), "jab");
        let change = NpcManager.apply(&mut world, &hit).unwrap();
        assert_eq!(change.target, "goblin_01");
        assert_eq!(world.npcs["goblin_01"].hp, 3);
    }

    #[test]
    fn test_inventory_remove_requires_item() {
        let world = world();
        let absent = StateOperationRequest::new(
            "mira",
            "inventory",
            StateOperation::Remove,
            json!("lantern"),
            "sold",
        );
        assert!(!NpcManager.can_perform(&world, &absent).valid);

        let present = StateOperationRequest::new(
            "mira",
            "inventory",
            StateOperation::Remove,
            json!("rope"),
            "sold",
        );
        assert!(NpcManager.can_perform(&world, &present).valid);
    }

    #[test]
    fn test_current_value_reads() {
        let world = world();
        assert_eq!(
            NpcManager.current_value(&world, "goblin_01", "hp"),
            Some(json!(4))
        );
        assert_eq!(
            NpcManager.current_value(&world, "mira", "role"),
            Some(json!("merchant"))
        );
        assert!(NpcManager
            .current_value(&world, "goblin_01", "mp")
            .is_none());
    }
}
