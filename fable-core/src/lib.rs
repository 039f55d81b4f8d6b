//! Turn-based action-resolution engine for text adventures.
//!
//! This crate provides:
//! - A catalog of built-in actions (attack, search, dialogue, trade, move,
//!   status, interact, skill) plus a registry for custom ones
//! - Transactional, all-or-nothing state mutation with validation and
//!   cascading side effects
//! - Deterministic entity matching and dice with injectable randomness
//! - A bounded history of processed turns
//!
//! The engine turns classified intents into concrete world changes and
//! structured results. The surrounding application owns the other half of
//! the loop: parsing player text into [`Intent`]s and narrating
//! [`ExecutionResult`]s back out.
//!
//! # Quick Start
//!
//! ```
//! use fable_core::testing::{sample_world, FixedRoller};
//! use fable_core::{ExecutionEngine, Intent, IntentCategory};
//!
//! let mut world = sample_world();
//! let mut engine = ExecutionEngine::new()
//!     .with_roller(Box::new(FixedRoller::new(vec![4])));
//!
//! let intent = Intent::new(IntentCategory::Attack, "strike the goblin")
//!     .with_target("goblin");
//! let result = engine.process(&mut world, &intent);
//!
//! assert!(result.success);
//! assert_eq!(world.npcs["goblin_01"].hp, 0);
//! ```

pub mod actions;
pub mod dice;
pub mod engine;
pub mod intent;
pub mod outcome;
pub mod state;
pub mod testing;
pub mod transaction;
pub mod world;

// Primary public API
pub use actions::{default_actions, Action, ActionError, ActionRegistry};
pub use dice::{DiceError, DiceExpression, DiceRoll, DiceRoller, DieType, RandomRoller};
pub use engine::{ExecutionEngine, ExecutionHistory, ExecutionRecord, DEFAULT_HISTORY_CAPACITY};
pub use intent::{fuzzy_match, Intent, IntentCategory, TargetRef};
pub use outcome::{metadata_keys, ExecutionResult, StateChange};
pub use state::{
    StateManager, StateManagerRegistry, StateOperation, StateOperationRequest,
    StateValidationResult,
};
pub use transaction::{StateTransaction, TransactionError, MAX_CASCADE_DEPTH};
pub use world::{GameWorld, Location, NpcRole, NpcState, PlayerState};
