//! Classified player intents and entity-name matching.
//!
//! An [`Intent`] arrives once per turn from the upstream classifier and is
//! read-only from then on. The classifier contract: `category` is one of the
//! known tags (anything else deserializes to [`IntentCategory::Other`]) and
//! `target` is a real entity name or the literal `"unspecified"` sentinel,
//! never a guessed default, and nothing downstream may substitute one.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Coarse classification of what the player is trying to do.
///
/// Closed set; the classifier maps anything it cannot place onto `Other`,
/// which actions may register for explicitly. Deserialization goes through
/// [`From<String>`], so an unrecognized tag becomes `Other` instead of an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IntentCategory {
    Attack,
    Search,
    Dialogue,
    Trade,
    Move,
    Status,
    Interact,
    Skill,
    Other,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 9] = [
        IntentCategory::Attack,
        IntentCategory::Search,
        IntentCategory::Dialogue,
        IntentCategory::Trade,
        IntentCategory::Move,
        IntentCategory::Status,
        IntentCategory::Interact,
        IntentCategory::Skill,
        IntentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Attack => "attack",
            IntentCategory::Search => "search",
            IntentCategory::Dialogue => "dialogue",
            IntentCategory::Trade => "trade",
            IntentCategory::Move => "move",
            IntentCategory::Status => "status",
            IntentCategory::Interact => "interact",
            IntentCategory::Skill => "skill",
            IntentCategory::Other => "other",
        }
    }
}

impl From<&str> for IntentCategory {
    fn from(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "attack" => IntentCategory::Attack,
            "search" => IntentCategory::Search,
            "dialogue" => IntentCategory::Dialogue,
            "trade" => IntentCategory::Trade,
            "move" => IntentCategory::Move,
            "status" => IntentCategory::Status,
            "interact" => IntentCategory::Interact,
            "skill" => IntentCategory::Skill,
            _ => IntentCategory::Other,
        }
    }
}

impl From<String> for IntentCategory {
    fn from(tag: String) -> Self {
        IntentCategory::from(tag.as_str())
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the entity an intent is aimed at.
///
/// Serialized as a plain string; the literal `"unspecified"` (or an empty
/// string) is the sentinel for "the player did not name one".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Named(String),
    Unspecified,
}

impl TargetRef {
    pub const SENTINEL: &'static str = "unspecified";

    pub fn named(name: impl Into<String>) -> Self {
        TargetRef::Named(name.into())
    }

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::SENTINEL) {
            TargetRef::Unspecified
        } else {
            TargetRef::Named(trimmed.to_string())
        }
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self, TargetRef::Unspecified)
    }

    /// The entity name, if one was given.
    pub fn name(&self) -> Option<&str> {
        match self {
            TargetRef::Named(name) => Some(name),
            TargetRef::Unspecified => None,
        }
    }
}

impl From<&str> for TargetRef {
    fn from(raw: &str) -> Self {
        TargetRef::parse(raw)
    }
}

impl From<String> for TargetRef {
    fn from(raw: String) -> Self {
        TargetRef::parse(&raw)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Named(name) => f.write_str(name),
            TargetRef::Unspecified => f.write_str(Self::SENTINEL),
        }
    }
}

impl Serialize for TargetRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TargetRef::Named(name) => serializer.serialize_str(name),
            TargetRef::Unspecified => serializer.serialize_str(Self::SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for TargetRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TargetRef::parse(&raw))
    }
}

/// One classified player intention, immutable for the turn it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub category: IntentCategory,
    /// Free-text description of the attempt, as the classifier phrased it.
    pub action: String,
    #[serde(default = "default_target")]
    pub target: TargetRef,
    /// Open bag of classifier extras (e.g. `mp_cost`, `direction`).
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Classifier confidence in `[0, 1]`.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_target() -> TargetRef {
    TargetRef::Unspecified
}

fn default_confidence() -> f32 {
    1.0
}

impl Intent {
    pub fn new(category: IntentCategory, action: impl Into<String>) -> Self {
        Intent {
            category,
            action: action.into(),
            target: TargetRef::Unspecified,
            parameters: Map::new(),
            confidence: 1.0,
        }
    }

    pub fn with_target(mut self, target: impl Into<TargetRef>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Integer parameter lookup, tolerant of JSON number widths.
    pub fn parameter_i64(&self, key: &str) -> Option<i64> {
        self.parameters.get(key).and_then(Value::as_i64)
    }

    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

/// Case-insensitive substring match, the single fuzzy matcher used for every
/// entity-name lookup (NPCs, locations, objects).
///
/// `query` matches `candidate` when the lowercased candidate contains the
/// lowercased query. Where several candidates qualify, callers scan them in
/// deterministic (sorted-key) order and take the first.
pub fn fuzzy_match(query: &str, candidate: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }
    candidate.to_lowercase().contains(&query.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_from_unknown_tag() {
        assert_eq!(IntentCategory::from("attack"), IntentCategory::Attack);
        assert_eq!(IntentCategory::from("  Move "), IntentCategory::Move);
        assert_eq!(IntentCategory::from("juggle"), IntentCategory::Other);
    }

    #[test]
    fn test_category_tags_round_trip() {
        for category in IntentCategory::ALL {
            assert_eq!(IntentCategory::from(category.as_str()), category);
        }
    }

    #[test]
    fn test_category_serde_routes_unknown_to_other() {
        let cat: IntentCategory = serde_json::from_str("\"dialogue\"").unwrap();
        assert_eq!(cat, IntentCategory::Dialogue);

        let cat: IntentCategory = serde_json::from_str("\"somersault\"").unwrap();
        assert_eq!(cat, IntentCategory::Other);

        assert_eq!(
            serde_json::to_string(&IntentCategory::Skill).unwrap(),
            "\"skill\""
        );
    }

    #[test]
    fn test_target_sentinel() {
        assert_eq!(TargetRef::parse("goblin"), TargetRef::named("goblin"));
        assert_eq!(TargetRef::parse("unspecified"), TargetRef::Unspecified);
        assert_eq!(TargetRef::parse("  "), TargetRef::Unspecified);
        assert!(TargetRef::parse("Unspecified").is_unspecified());
    }

    #[test]
    fn test_target_serde() {
        let target: TargetRef = serde_json::from_str("\"unspecified\"").unwrap();
        assert!(target.is_unspecified());

        let target: TargetRef = serde_json::from_str("\"goblin\"").unwrap();
        assert_eq!(target.name(), Some("goblin"));

        assert_eq!(
            serde_json::to_string(&TargetRef::Unspecified).unwrap(),
            "\"unspecified\""
        );
    }

    #[test]
    fn test_intent_builder() {
        let intent = Intent::new(IntentCategory::Skill, "cast a healing spell")
            .with_target("self")
            .with_parameter("mp_cost", json!(4))
            .with_confidence(0.82);

        assert_eq!(intent.category, IntentCategory::Skill);
        assert_eq!(intent.target.name(), Some("self"));
        assert_eq!(intent.parameter_i64("mp_cost"), Some(4));
        assert!(intent.parameter_i64("missing").is_none());
    }

    #[test]
    fn test_intent_deserializes_with_defaults() {
        let intent: Intent =
            serde_json::from_value(json!({"category": "search", "action": "look around"}))
                .unwrap();
        assert!(intent.target.is_unspecified());
        assert!(intent.parameters.is_empty());
        assert!((intent.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fuzzy_match() {
        assert!(fuzzy_match("gob", "Forest Goblin"));
        assert!(fuzzy_match("GOBLIN", "forest goblin"));
        assert!(!fuzzy_match("orc", "forest goblin"));
        assert!(!fuzzy_match("", "forest goblin"));
        assert!(!fuzzy_match("   ", "forest goblin"));
    }
}
