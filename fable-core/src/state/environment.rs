//! Environment-domain state manager.
//!
//! Owns interactable-object state, world-wide conditions (time of day,
//! weather), and the location-adjacency queries movement relies on. Location
//! data itself is static content; the manager answers reads on it but
//! rejects mutation.
//!
//! Objects can be addressed two ways: target `environment` with a
//! `objects.<id>.<prop>` path, or the object id directly as the target with
//! a bare property. Changes are always recorded under the canonical object
//! id.

use super::{
    split_path, StateError, StateManager, StateOperation, StateOperationRequest,
    StateValidationResult,
};
use crate::outcome::StateChange;
use crate::world::{GameWorld, WorldObject};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Canonical target name for world-wide environment state.
pub const ENVIRONMENT_TARGET: &str = "environment";

/// Why a single-step move was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveBlocked {
    AlreadyThere,
    UnknownLocation(String),
    NotAdjacent { from: String, to: String },
    Blocked { to: String, requirement: Option<String> },
}

impl fmt::Display for MoveBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveBlocked::AlreadyThere => f.write_str("already there"),
            MoveBlocked::UnknownLocation(id) => write!(f, "unknown location: {id}"),
            MoveBlocked::NotAdjacent { from, to } => {
                write!(f, "no direct path from {from} to {to}")
            }
            MoveBlocked::Blocked {
                to,
                requirement: Some(requirement),
            } => write!(f, "the way to {to} is blocked: {requirement}"),
            MoveBlocked::Blocked {
                to,
                requirement: None,
            } => write!(f, "the way to {to} is blocked"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentManager;

impl EnvironmentManager {
    fn is_env_alias(target: &str) -> bool {
        target.eq_ignore_ascii_case(ENVIRONMENT_TARGET) || target.eq_ignore_ascii_case("world")
    }

    fn location_key<'a>(world: &'a GameWorld, id: &str) -> Option<&'a str> {
        world
            .locations
            .keys()
            .find(|k| k.eq_ignore_ascii_case(id))
            .map(String::as_str)
    }

    /// Locate an object by id across all locations; object ids are unique
    /// within a world.
    fn locate_object(world: &GameWorld, object_id: &str) -> Option<(String, String)> {
        world.locations.iter().find_map(|(loc_id, loc)| {
            loc.objects
                .keys()
                .find(|id| id.eq_ignore_ascii_case(object_id))
                .map(|id| (loc_id.clone(), id.clone()))
        })
    }

    fn object<'a>(world: &'a GameWorld, loc_id: &str, obj_id: &str) -> Option<&'a WorldObject> {
        world.locations.get(loc_id).and_then(|l| l.objects.get(obj_id))
    }

    /// Normalize `(target, property)` into `(location, object, property)` for
    /// object-addressed requests.
    fn resolve_object_ref(
        world: &GameWorld,
        target: &str,
        property: &str,
    ) -> Option<(String, String, String)> {
        if Self::is_env_alias(target) {
            match split_path(property) {
                ("objects", Some(rest)) => {
                    let (obj_id, prop) = split_path(rest);
                    let prop = prop?;
                    Self::locate_object(world, obj_id)
                        .map(|(loc, obj)| (loc, obj, prop.to_string()))
                }
                _ => None,
            }
        } else {
            Self::locate_object(world, target)
                .map(|(loc, obj)| (loc, obj, property.to_string()))
        }
    }

    fn validate_object_op(
        world: &GameWorld,
        loc_id: &str,
        obj_id: &str,
        prop: &str,
        request: &StateOperationRequest,
    ) -> StateValidationResult {
        let Some(object) = Self::object(world, loc_id, obj_id) else {
            return StateValidationResult::rejected(format!("unknown object: {obj_id}"));
        };
        if request.operation != StateOperation::Set || !request.value.is_boolean() {
            return StateValidationResult::rejected(format!(
                "{prop} only accepts set true/false"
            ));
        }
        match prop {
            "opened" => {
                if request.value == json!(true) && object.locked {
                    StateValidationResult::rejected(format!("{} is locked", object.name))
                } else {
                    StateValidationResult::ok()
                }
            }
            "locked" => StateValidationResult::ok(),
            _ => StateValidationResult::rejected(format!("unknown object property: {prop}")),
        }
    }

    /// Shortest path between two locations over unblocked connections.
    ///
    /// Plain breadth-first search; neighbors expand in each location's
    /// connection-list order, so equal-length ties resolve to the
    /// earlier-listed route. Returns the full path including both endpoints.
    pub fn find_path(&self, world: &GameWorld, from: &str, to: &str) -> Option<Vec<String>> {
        let (from, _) = world.locations.get_key_value(from)?;
        let (to, _) = world.locations.get_key_value(to)?;
        let (from, to) = (from.as_str(), to.as_str());
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        visited.insert(from);
        let mut parents: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            let Some(location) = world.locations.get(current) else {
                continue;
            };
            for connection in &location.connections {
                if connection.blocked {
                    continue;
                }
                let next = connection.to.as_str();
                if !world.locations.contains_key(next) || !visited.insert(next) {
                    continue;
                }
                parents.insert(next, current);
                if next == to {
                    let mut path = vec![to.to_string()];
                    let mut cursor = to;
                    while let Some(&prev) = parents.get(cursor) {
                        path.push(prev.to_string());
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Whether any unblocked route connects the two locations.
    pub fn check_accessibility(&self, world: &GameWorld, from: &str, to: &str) -> bool {
        self.find_path(world, from, to).is_some()
    }

    /// Whether a single step from `from` to `to` is possible right now.
    pub fn can_move(&self, world: &GameWorld, from: &str, to: &str) -> Result<(), MoveBlocked> {
        if !world.locations.contains_key(from) {
            return Err(MoveBlocked::UnknownLocation(from.to_string()));
        }
        if !world.locations.contains_key(to) {
            return Err(MoveBlocked::UnknownLocation(to.to_string()));
        }
        if from == to {
            return Err(MoveBlocked::AlreadyThere);
        }
        match world.locations.get(from).and_then(|l| l.connection_to(to)) {
            None => Err(MoveBlocked::NotAdjacent {
                from: from.to_string(),
                to: to.to_string(),
            }),
            Some(connection) if connection.blocked => Err(MoveBlocked::Blocked {
                to: to.to_string(),
                requirement: connection.requirement.clone(),
            }),
            Some(_) => Ok(()),
        }
    }
}

impl StateManager for EnvironmentManager {
    fn supports_target(&self, world: &GameWorld, target: &str) -> bool {
        Self::is_env_alias(target)
            || Self::location_key(world, target).is_some()
            || Self::locate_object(world, target).is_some()
    }

    fn can_perform(
        &self,
        world: &GameWorld,
        request: &StateOperationRequest,
    ) -> StateValidationResult {
        let target = request.target.as_str();
        let path = request.property.as_str();

        if let Some((loc, obj, prop)) = Self::resolve_object_ref(world, target, path) {
            return Self::validate_object_op(world, &loc, &obj, &prop, request);
        }

        if Self::is_env_alias(target) {
            return match split_path(path) {
                ("time_of_day", None) | ("weather", None) => {
                    if request.operation == StateOperation::Set && request.value.is_string() {
                        StateValidationResult::ok()
                    } else {
                        StateValidationResult::rejected(format!("{path} only accepts set <text>"))
                    }
                }
                ("objects", Some(rest)) => {
                    StateValidationResult::rejected(format!("unknown object path: {rest}"))
                }
                _ => StateValidationResult::rejected(format!(
                    "unknown environment property: {path}"
                )),
            };
        }

        if Self::location_key(world, target).is_some() {
            return StateValidationResult::rejected("location data is static");
        }

        StateValidationResult::rejected(format!("unknown environment target: {target}"))
    }

    fn apply(
        &self,
        world: &mut GameWorld,
        request: &StateOperationRequest,
    ) -> Result<StateChange, StateError> {
        let target = request.target.as_str();
        let path = request.property.as_str();

        if let Some((loc, obj_id, prop)) = Self::resolve_object_ref(world, target, path) {
            let flag = request
                .value
                .as_bool()
                .ok_or_else(|| StateError::WrongValueType {
                    expected: "boolean",
                    target: obj_id.clone(),
                    property: prop.clone(),
                })?;
            let object = world
                .locations
                .get_mut(&loc)
                .and_then(|l| l.objects.get_mut(&obj_id))
                .ok_or_else(|| StateError::UnsupportedTarget(obj_id.clone()))?;
            let old = match prop.as_str() {
                "opened" => {
                    let old = object.opened;
                    object.opened = flag;
                    old
                }
                "locked" => {
                    let old = object.locked;
                    object.locked = flag;
                    old
                }
                _ => {
                    return Err(StateError::UnknownProperty {
                        target: obj_id,
                        property: prop,
                    })
                }
            };
            return Ok(StateChange::new(
                obj_id,
                prop,
                request.operation,
                json!(old),
                json!(flag),
                request.reason.clone(),
            ));
        }

        if Self::is_env_alias(target) {
            let text = request
                .value
                .as_str()
                .ok_or_else(|| StateError::WrongValueType {
                    expected: "string",
                    target: ENVIRONMENT_TARGET.to_string(),
                    property: request.property.clone(),
                })?;
            let old = match split_path(path) {
                ("time_of_day", None) => {
                    let old = world.global.time_of_day.clone();
                    world.global.time_of_day = text.to_string();
                    old
                }
                ("weather", None) => {
                    let old = world.global.weather.clone();
                    world.global.weather = text.to_string();
                    old
                }
                _ => {
                    return Err(StateError::UnknownProperty {
                        target: ENVIRONMENT_TARGET.to_string(),
                        property: request.property.clone(),
                    })
                }
            };
            return Ok(StateChange::new(
                ENVIRONMENT_TARGET,
                request.property.clone(),
                request.operation,
                json!(old),
                json!(text),
                request.reason.clone(),
            ));
        }

        Err(StateError::UnsupportedTarget(request.target.clone()))
    }

    fn current_value(&self, world: &GameWorld, target: &str, property: &str) -> Option<Value> {
        if let Some((loc, obj_id, prop)) = Self::resolve_object_ref(world, target, property) {
            let object = Self::object(world, &loc, &obj_id)?;
            return match prop.as_str() {
                "name" => Some(json!(object.name)),
                "kind" => serde_json::to_value(object.kind).ok(),
                "opened" => Some(json!(object.opened)),
                "locked" => Some(json!(object.locked)),
                _ => None,
            };
        }

        if Self::is_env_alias(target) {
            return match split_path(property) {
                ("time_of_day", None) => Some(json!(world.global.time_of_day)),
                ("weather", None) => Some(json!(world.global.weather)),
                _ => None,
            };
        }

        let key = Self::location_key(world, target)?;
        let location = world.locations.get(key)?;
        match split_path(property) {
            ("name", None) => Some(json!(location.name)),
            ("description", None) => Some(json!(location.description)),
            ("exits", None) => Some(json!(location
                .connections
                .iter()
                .map(|c| c.to.clone())
                .collect::<Vec<_>>())),
            _ => None,
        }
    }
}
