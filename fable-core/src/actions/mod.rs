//! The [`Action`] abstraction and its category-keyed registry.
//!
//! Actions are the pluggable unit of game mechanics: each one declares the
//! intent categories it answers for, a cheap read-only `can_execute` check,
//! and an `execute` that performs every mutation through the transaction it
//! is handed. The engine ships a built-in catalog ([`catalog`]) and accepts
//! custom actions registered alongside or instead of it.

pub mod catalog;

pub use catalog::default_actions;

use crate::dice::{DiceError, DiceRoller};
use crate::intent::{Intent, IntentCategory};
use crate::outcome::ExecutionResult;
use crate::transaction::{StateTransaction, TransactionError};
use crate::world::GameWorld;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Unexpected fault inside an action.
///
/// Reserved for programming-level failures: a rejected or impossible state
/// change, a malformed dice expression. Game-outcome failures (missed check,
/// missing target) are `Ok` results with `success == false`.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Transaction(#[from] TransactionError),
    #[error("{0}")]
    Dice(#[from] DiceError),
    #[error("{0}")]
    Internal(String),
}

/// One executable game mechanic.
pub trait Action {
    /// Stable name, unique across the registry; used for unregistration and
    /// history records.
    fn name(&self) -> &str;

    /// Intent categories this action answers for.
    fn categories(&self) -> &[IntentCategory];

    /// Cheap read-only check: could this action handle the intent right now?
    /// Must not mutate anything.
    fn can_execute(&self, intent: &Intent, world: &GameWorld) -> bool;

    /// Perform the action. Every world mutation goes through `txn`; rolls go
    /// through `dice` so callers control randomness.
    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError>;
}

/// Actions bucketed by intent category.
///
/// Within a bucket, resolution order is registration order: the first action
/// whose `can_execute` passes wins, which is also the documented tie-break
/// when several would accept the same intent. Register more specific actions
/// before general ones.
#[derive(Default)]
pub struct ActionRegistry {
    buckets: HashMap<IntentCategory, Vec<Arc<dyn Action>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        ActionRegistry::default()
    }

    /// Registry preloaded with the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = ActionRegistry::new();
        for action in catalog::default_actions() {
            registry.register(action);
        }
        registry
    }

    /// File the action under every category it declares.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        tracing::debug!(action = action.name(), "registered action");
        for category in action.categories() {
            self.buckets
                .entry(*category)
                .or_default()
                .push(Arc::clone(&action));
        }
    }

    /// Remove the named action from every bucket. Returns whether anything
    /// was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let mut removed = false;
        for bucket in self.buckets.values_mut() {
            let before = bucket.len();
            bucket.retain(|action| action.name() != name);
            removed |= bucket.len() != before;
        }
        if removed {
            tracing::debug!(action = name, "unregistered action");
        }
        removed
    }

    /// Actions registered for a category, in registration order.
    pub fn actions_for(&self, category: IntentCategory) -> &[Arc<dyn Action>] {
        self.buckets
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First registered action in the intent's category bucket that accepts
    /// the intent.
    pub fn resolve(&self, intent: &Intent, world: &GameWorld) -> Option<&dyn Action> {
        self.actions_for(intent.category)
            .iter()
            .find(|action| action.can_execute(intent, world))
            .map(|action| action.as_ref())
    }

    /// Distinct registered action names, sorted.
    pub fn action_names(&self) -> Vec<String> {
        let names: BTreeSet<_> = self
            .buckets
            .values()
            .flatten()
            .map(|action| action.name().to_string())
            .collect();
        names.into_iter().collect()
    }

    /// Number of distinct registered actions.
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flatten()
            .map(|action| action.name())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }
}
