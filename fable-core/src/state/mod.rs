//! Domain-scoped state validation and mutation.
//!
//! Each [`StateManager`] owns the validate/apply logic for one slice of the
//! world (player, NPCs, environment). Proposed operations flow through
//! [`can_perform`](StateManager::can_perform) before any mutation; validation
//! may attach cascading side-effect proposals (an HP loss that flips an
//! `alive` flag), which the transaction feeds back through the same pipeline.

pub mod environment;
pub mod npc;
pub mod player;

pub use environment::{EnvironmentManager, MoveBlocked};
pub use npc::NpcManager;
pub use player::PlayerManager;

use crate::outcome::StateChange;
use crate::world::GameWorld;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error type for structurally impossible applications.
///
/// Game-rule refusals travel as invalid [`StateValidationResult`]s; these
/// errors mean the request itself was malformed for the domain it reached.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("No state manager supports target: {0}")]
    UnsupportedTarget(String),
    #[error("Unknown property '{property}' on {target}")]
    UnknownProperty { target: String, property: String },
    #[error("Operation '{operation}' cannot apply to {target}.{property}")]
    InvalidOperation {
        operation: StateOperation,
        target: String,
        property: String,
    },
    #[error("Expected a {expected} value for {target}.{property}")]
    WrongValueType {
        expected: &'static str,
        target: String,
        property: String,
    },
    #[error("{target} has no '{item}' to remove")]
    MissingItem { target: String, item: String },
}

/// Split a dot path into its head and remainder:
/// `attributes.strength` -> `("attributes", Some("strength"))`.
pub(crate) fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Rule-level numeric combine: rejects list operations and non-integer
/// operands, otherwise returns the prospective value.
pub(crate) fn numeric_next(
    request: &StateOperationRequest,
    current: i64,
) -> Result<i64, StateValidationResult> {
    if !request.operation.is_numeric() {
        return Err(StateValidationResult::rejected(format!(
            "operation '{}' does not apply to {}",
            request.operation, request.property
        )));
    }
    let operand = request.value_i64().ok_or_else(|| {
        StateValidationResult::rejected(format!("{} expects an integer value", request.property))
    })?;
    request
        .operation
        .apply_numeric(current, operand)
        .ok_or_else(|| {
            StateValidationResult::rejected(format!(
                "operation '{}' does not apply to {}",
                request.operation, request.property
            ))
        })
}

/// Apply-side numeric combine, reporting structural errors.
pub(crate) fn numeric_apply(
    request: &StateOperationRequest,
    current: i64,
    target: &str,
) -> Result<i64, StateError> {
    let operand = request
        .value_i64()
        .ok_or_else(|| StateError::WrongValueType {
            expected: "integer",
            target: target.to_string(),
            property: request.property.clone(),
        })?;
    request
        .operation
        .apply_numeric(current, operand)
        .ok_or_else(|| StateError::InvalidOperation {
            operation: request.operation,
            target: target.to_string(),
            property: request.property.clone(),
        })
}

/// How a proposed value combines with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateOperation {
    Set,
    Add,
    Subtract,
    Multiply,
    Append,
    Remove,
}

impl StateOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateOperation::Set => "set",
            StateOperation::Add => "add",
            StateOperation::Subtract => "subtract",
            StateOperation::Multiply => "multiply",
            StateOperation::Append => "append",
            StateOperation::Remove => "remove",
        }
    }

    /// Whether this operation combines numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            StateOperation::Set
                | StateOperation::Add
                | StateOperation::Subtract
                | StateOperation::Multiply
        )
    }

    /// Whether this operation edits a list.
    pub fn is_list(&self) -> bool {
        matches!(self, StateOperation::Append | StateOperation::Remove)
    }

    /// Combine a numeric operand with the current value. `None` for the list
    /// operations.
    pub fn apply_numeric(&self, current: i64, operand: i64) -> Option<i64> {
        match self {
            StateOperation::Set => Some(operand),
            StateOperation::Add => Some(current.saturating_add(operand)),
            StateOperation::Subtract => Some(current.saturating_sub(operand)),
            StateOperation::Multiply => Some(current.saturating_mul(operand)),
            StateOperation::Append | StateOperation::Remove => None,
        }
    }
}

impl fmt::Display for StateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed mutation, transient within one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOperationRequest {
    pub target: String,
    /// Dot-separated property path, e.g. `hp` or `attributes.strength`.
    pub property: String,
    pub operation: StateOperation,
    pub value: Value,
    pub reason: String,
}

impl StateOperationRequest {
    pub fn new(
        target: impl Into<String>,
        property: impl Into<String>,
        operation: StateOperation,
        value: Value,
        reason: impl Into<String>,
    ) -> Self {
        StateOperationRequest {
            target: target.into(),
            property: property.into(),
            operation,
            value,
            reason: reason.into(),
        }
    }

    pub fn set(
        target: impl Into<String>,
        property: impl Into<String>,
        value: Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(target, property, StateOperation::Set, value, reason)
    }

    pub fn add(
        target: impl Into<String>,
        property: impl Into<String>,
        value: Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(target, property, StateOperation::Add, value, reason)
    }

    pub fn subtract(
        target: impl Into<String>,
        property: impl Into<String>,
        value: Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(target, property, StateOperation::Subtract, value, reason)
    }

    pub fn value_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    /// Stable identity used to deduplicate re-triggered cascades.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.target, self.property, self.operation, self.value
        )
    }
}

impl fmt::Display for StateOperationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} {}",
            self.operation, self.target, self.property, self.value
        )
    }
}

/// Verdict on a proposed operation, possibly with follow-on proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub side_effects: Vec<StateOperationRequest>,
}

impl StateValidationResult {
    pub fn ok() -> Self {
        StateValidationResult {
            valid: true,
            reason: None,
            side_effects: Vec::new(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        StateValidationResult {
            valid: false,
            reason: Some(reason.into()),
            side_effects: Vec::new(),
        }
    }

    pub fn with_side_effect(mut self, effect: StateOperationRequest) -> Self {
        self.side_effects.push(effect);
        self
    }
}

/// Owner of validation and mutation for one world domain.
///
/// `can_perform` and `current_value` are read-only; `apply` assumes the
/// request was validated and fails only on structural mismatches.
pub trait StateManager {
    /// Whether this manager governs the named target.
    fn supports_target(&self, world: &GameWorld, target: &str) -> bool;

    fn can_perform(
        &self,
        world: &GameWorld,
        request: &StateOperationRequest,
    ) -> StateValidationResult;

    fn apply(
        &self,
        world: &mut GameWorld,
        request: &StateOperationRequest,
    ) -> Result<StateChange, StateError>;

    fn current_value(&self, world: &GameWorld, target: &str, property: &str) -> Option<Value>;
}

/// Ordered collection of domain managers.
///
/// Routing is first-match over `supports_target` in registration order, so
/// more specific domains should register first.
#[derive(Default)]
pub struct StateManagerRegistry {
    managers: Vec<(String, Box<dyn StateManager>)>,
}

impl StateManagerRegistry {
    pub fn new() -> Self {
        StateManagerRegistry::default()
    }

    /// The player/NPC/environment managers in their standard order.
    pub fn with_defaults() -> Self {
        let mut registry = StateManagerRegistry::new();
        registry.register("player", Box::new(PlayerManager));
        registry.register("npc", Box::new(NpcManager));
        registry.register("environment", Box::new(EnvironmentManager));
        registry
    }

    pub fn register(&mut self, domain: impl Into<String>, manager: Box<dyn StateManager>) {
        let domain = domain.into();
        tracing::debug!(domain = %domain, "registered state manager");
        self.managers.push((domain, manager));
    }

    /// First manager claiming the target, with its domain name.
    pub fn manager_for(
        &self,
        world: &GameWorld,
        target: &str,
    ) -> Option<(&str, &dyn StateManager)> {
        self.managers
            .iter()
            .find(|(_, m)| m.supports_target(world, target))
            .map(|(domain, m)| (domain.as_str(), m.as_ref()))
    }

    /// Routed read of a target's property.
    pub fn current_value(&self, world: &GameWorld, target: &str, property: &str) -> Option<Value> {
        self.manager_for(world, target)
            .and_then(|(_, m)| m.current_value(world, target, property))
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::PlayerState;
    use serde_json::json;

    struct FixedDomain {
        claims: &'static str,
        answer: i64,
    }

    impl StateManager for FixedDomain {
        fn supports_target(&self, _world: &GameWorld, target: &str) -> bool {
            target == self.claims
        }

        fn can_perform(
            &self,
            _world: &GameWorld,
            _request: &StateOperationRequest,
        ) -> StateValidationResult {
            StateValidationResult::ok()
        }

        fn apply(
            &self,
            _world: &mut GameWorld,
            request: &StateOperationRequest,
        ) -> Result<StateChange, StateError> {
            Ok(StateChange::new(
                request.target.clone(),
                request.property.clone(),
                request.operation,
                json!(self.answer),
                request.value.clone(),
                request.reason.clone(),
            ))
        }

        fn current_value(
            &self,
            _world: &GameWorld,
            _target: &str,
            _property: &str,
        ) -> Option<Value> {
            Some(json!(self.answer))
        }
    }

    #[test]
    fn test_operation_apply_numeric() {
        assert_eq!(StateOperation::Set.apply_numeric(5, 9), Some(9));
        assert_eq!(StateOperation::Add.apply_numeric(5, 3), Some(8));
        assert_eq!(StateOperation::Subtract.apply_numeric(5, 8), Some(-3));
        assert_eq!(StateOperation::Multiply.apply_numeric(5, 2), Some(10));
        assert_eq!(StateOperation::Append.apply_numeric(5, 2), None);
    }

    #[test]
    fn test_operation_serde_tags() {
        assert_eq!(
            serde_json::to_string(&StateOperation::Subtract).unwrap(),
            "\"subtract\""
        );
        let op: StateOperation = serde_json::from_str("\"append\"").unwrap();
        assert_eq!(op, StateOperation::Append);
    }

    #[test]
    fn test_validation_builders() {
        let ok = StateValidationResult::ok().with_side_effect(StateOperationRequest::set(
            "goblin_01",
            "alive",
            json!(false),
            "hp fell to zero",
        ));
        assert!(ok.valid);
        assert_eq!(ok.side_effects.len(), 1);

        let no = StateValidationResult::rejected("insufficient mana");
        assert!(!no.valid);
        assert_eq!(no.reason.as_deref(), Some("insufficient mana"));
    }

    #[test]
    fn test_registry_routes_first_match() {
        let world = GameWorld::new(PlayerState::new("Arin"));
        let mut registry = StateManagerRegistry::new();
        registry.register(
            "first",
            Box::new(FixedDomain {
                claims: "shared",
                answer: 1,
            }),
        );
        registry.register(
            "second",
            Box::new(FixedDomain {
                claims: "shared",
                answer: 2,
            }),
        );

        let (domain, _) = registry.manager_for(&world, "shared").unwrap();
        assert_eq!(domain, "first");
        assert_eq!(
            registry.current_value(&world, "shared", "anything"),
            Some(json!(1))
        );
        assert!(registry.manager_for(&world, "unclaimed").is_none());
    }

    #[test]
    fn test_request_fingerprint_distinguishes_values() {
        let a = StateOperationRequest::set("goblin_01", "alive", json!(false), "x");
        let b = StateOperationRequest::set("goblin_01", "alive", json!(true), "y");
        assert_ne!(a.fingerprint(), b.fingerprint());
        // Reason is narrative, not identity.
        let c = StateOperationRequest::set("goblin_01", "alive", json!(false), "z");
        assert_eq!(a.fingerprint(), c.fingerprint());
    }
}
