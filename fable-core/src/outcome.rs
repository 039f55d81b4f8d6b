//! Structured execution outcomes handed to the narrative layer.
//!
//! An [`ExecutionResult`] is created fresh per processed intent and immutable
//! once returned. The downstream generator renders every [`StateChange`] and
//! dice roll as concrete numbers and treats the metadata map, in particular
//! [`metadata_keys::REQUIRES_AI_CONTENT`], as an instruction to author
//! creative content (a found item, a line of dialogue) this subsystem
//! deliberately does not hard-code.

use crate::dice::DiceRoll;
use crate::state::StateOperation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Well-known keys in [`ExecutionResult::metadata`].
pub mod metadata_keys {
    /// `true` when the narrative layer must author new content for this turn.
    pub const REQUIRES_AI_CONTENT: &str = "requires_ai_content";
    pub const ATTACK_TARGET: &str = "attack_target";
    pub const TARGET_DEFEATED: &str = "target_defeated";
    pub const SEARCH_TARGET: &str = "search_target";
    pub const DIALOGUE_TARGET: &str = "dialogue_target";
    pub const NPC_ROLE: &str = "npc_role";
    pub const TRADE_TARGET: &str = "trade_target";
    pub const MERCHANT_INVENTORY: &str = "merchant_inventory";
    pub const MOVEMENT_TARGET: &str = "movement_target";
    pub const INTERACTION_TARGET: &str = "interaction_target";
    pub const SKILL_NAME: &str = "skill_name";
    pub const SKILL_TARGET: &str = "skill_target";
    /// Structured player snapshot attached by the status action.
    pub const STATUS: &str = "status";
}

/// Immutable record of one committed mutation.
///
/// Doubles as the transaction's audit log entry and as the payload the
/// narrative generator turns into prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Entity the change applied to (`player`, an NPC id, an object id, …).
    pub target: String,
    /// Dot-separated property path, e.g. `hp` or `objects.chest_01.opened`.
    pub property: String,
    pub operation: StateOperation,
    pub old_value: Value,
    pub new_value: Value,
    pub reason: String,
}

impl StateChange {
    pub fn new(
        target: impl Into<String>,
        property: impl Into<String>,
        operation: StateOperation,
        old_value: Value,
        new_value: Value,
        reason: impl Into<String>,
    ) -> Self {
        StateChange {
            target: target.into(),
            property: property.into(),
            operation,
            old_value,
            new_value,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: {} -> {} ({})",
            self.target, self.property, self.old_value, self.new_value, self.reason
        )
    }
}

/// Outcome of resolving one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Short description of what was actually attempted.
    pub action_taken: String,
    /// Changes applied to the world, in application order. After a commit the
    /// engine overwrites this with the transaction's authoritative list.
    #[serde(default)]
    pub state_changes: Vec<StateChange>,
    #[serde(default)]
    pub dice_rolls: Vec<DiceRoll>,
    /// Populated only when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Open signal bag for the narrative layer; see [`metadata_keys`].
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ExecutionResult {
    pub fn success(action_taken: impl Into<String>) -> Self {
        ExecutionResult {
            success: true,
            action_taken: action_taken.into(),
            state_changes: Vec::new(),
            dice_rolls: Vec::new(),
            failure_reason: None,
            metadata: Map::new(),
        }
    }

    pub fn failure(action_taken: impl Into<String>, reason: impl Into<String>) -> Self {
        ExecutionResult {
            success: false,
            action_taken: action_taken.into(),
            state_changes: Vec::new(),
            dice_rolls: Vec::new(),
            failure_reason: Some(reason.into()),
            metadata: Map::new(),
        }
    }

    pub fn with_roll(mut self, roll: DiceRoll) -> Self {
        self.dice_rolls.push(roll);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Mark the result as needing authored narrative content.
    pub fn flag_ai_content(self) -> Self {
        self.with_metadata(metadata_keys::REQUIRES_AI_CONTENT, Value::Bool(true))
    }

    pub fn requires_ai_content(&self) -> bool {
        self.metadata
            .get(metadata_keys::REQUIRES_AI_CONTENT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// One-line summary for history records and logs.
    pub fn summary(&self) -> String {
        if self.success {
            format!(
                "{} ({} changes, {} rolls)",
                self.action_taken,
                self.state_changes.len(),
                self.dice_rolls.len()
            )
        } else {
            format!(
                "{} failed: {}",
                self.action_taken,
                self.failure_reason.as_deref().unwrap_or("unknown reason")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_builder() {
        let result = ExecutionResult::success("attack the goblin")
            .with_metadata(metadata_keys::ATTACK_TARGET, json!("goblin_01"))
            .flag_ai_content();

        assert!(result.success);
        assert!(result.failure_reason.is_none());
        assert!(result.requires_ai_content());
        assert_eq!(
            result.metadata.get(metadata_keys::ATTACK_TARGET),
            Some(&json!("goblin_01"))
        );
    }

    #[test]
    fn test_failure_carries_reason() {
        let result = ExecutionResult::failure("attack", "no such target: dragon");
        assert!(!result.success);
        assert_eq!(
            result.failure_reason.as_deref(),
            Some("no such target: dragon")
        );
        assert!(!result.requires_ai_content());
        assert!(result.summary().contains("no such target"));
    }

    #[test]
    fn test_serde_omits_absent_failure_reason() {
        let json = serde_json::to_value(ExecutionResult::success("look around")).unwrap();
        assert!(json.get("failure_reason").is_none());

        let back: ExecutionResult = serde_json::from_value(json).unwrap();
        assert!(back.success);
        assert!(back.state_changes.is_empty());
    }

    #[test]
    fn test_state_change_display() {
        let change = StateChange::new(
            "goblin_01",
            "hp",
            StateOperation::Subtract,
            json!(4),
            json!(0),
            "attack damage",
        );
        let line = change.to_string();
        assert!(line.contains("goblin_01.hp"));
        assert!(line.contains("attack damage"));
    }
}
