//! The execution engine: resolve an intent to an action, run it inside a
//! transaction, and record the outcome.
//!
//! [`ExecutionEngine::process`] never returns an error. Every way a turn can
//! go wrong (no action accepts the intent, a state change is rejected, the
//! action itself faults) comes back as an [`ExecutionResult`] with
//! `success == false` and a reason, so the caller always has something to
//! narrate. Each processed intent leaves exactly one history record,
//! including the failed ones.

use crate::actions::{Action, ActionRegistry};
use crate::dice::{DiceRoller, RandomRoller};
use crate::intent::{Intent, IntentCategory};
use crate::outcome::ExecutionResult;
use crate::state::{StateManager, StateManagerRegistry};
use crate::transaction::StateTransaction;
use crate::world::GameWorld;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// History entries kept when no capacity is given.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// One line of turn history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub category: IntentCategory,
    /// Name of the action that ran, or `None` when nothing accepted the
    /// intent.
    pub action: Option<String>,
    pub target: String,
    pub success: bool,
    pub summary: String,
    pub duration: Duration,
}

impl ExecutionRecord {
    pub fn from_outcome(
        intent: &Intent,
        action: Option<String>,
        result: &ExecutionResult,
        duration: Duration,
    ) -> Self {
        ExecutionRecord {
            id: Uuid::new_v4(),
            category: intent.category,
            action,
            target: intent.target.to_string(),
            success: result.success,
            summary: result.summary(),
            duration,
        }
    }
}

/// Ring buffer of recent [`ExecutionRecord`]s.
///
/// Pushing at capacity evicts the oldest record, so memory stays bounded no
/// matter how long a session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionHistory {
    records: VecDeque<ExecutionRecord>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// A capacity of zero is bumped to one; an empty ring could never record
    /// anything.
    pub fn with_capacity(capacity: usize) -> Self {
        ExecutionHistory {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, record: ExecutionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&ExecutionRecord> {
        self.records.back()
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        ExecutionHistory::new()
    }
}

/// Orchestrator tying together action resolution, transactional state
/// mutation, dice, and history.
pub struct ExecutionEngine {
    actions: ActionRegistry,
    managers: StateManagerRegistry,
    roller: Box<dyn DiceRoller>,
    history: ExecutionHistory,
}

impl ExecutionEngine {
    /// Engine loaded with the built-in action catalog and the standard
    /// player/NPC/environment managers.
    pub fn new() -> Self {
        ExecutionEngine {
            actions: ActionRegistry::with_defaults(),
            managers: StateManagerRegistry::with_defaults(),
            roller: Box::new(RandomRoller::new()),
            history: ExecutionHistory::new(),
        }
    }

    /// Engine with nothing registered, for fully custom setups.
    pub fn empty() -> Self {
        ExecutionEngine {
            actions: ActionRegistry::new(),
            managers: StateManagerRegistry::new(),
            roller: Box::new(RandomRoller::new()),
            history: ExecutionHistory::new(),
        }
    }

    /// Replace the dice source; tests inject scripted rollers here.
    pub fn with_roller(mut self, roller: Box<dyn DiceRoller>) -> Self {
        self.roller = roller;
        self
    }

    /// Replace the history buffer, e.g. to change its capacity or restore a
    /// saved session's records.
    pub fn with_history(mut self, history: ExecutionHistory) -> Self {
        self.history = history;
        self
    }

    pub fn register_action(&mut self, action: Arc<dyn Action>) {
        self.actions.register(action);
    }

    pub fn unregister_action(&mut self, name: &str) -> bool {
        self.actions.unregister(name)
    }

    pub fn register_state_manager(
        &mut self,
        domain: impl Into<String>,
        manager: Box<dyn StateManager>,
    ) {
        self.managers.register(domain, manager);
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn state_managers(&self) -> &StateManagerRegistry {
        &self.managers
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    /// Process one intent against the world.
    ///
    /// Resolution picks the first registered action in the intent's category
    /// whose `can_execute` passes. The action runs inside a transaction:
    /// a successful result commits (and the result's `state_changes` are
    /// overwritten with the transaction's authoritative list, cascades
    /// included), while failures and faults roll everything back.
    pub fn process(&mut self, world: &mut GameWorld, intent: &Intent) -> ExecutionResult {
        let started = Instant::now();
        let span = tracing::info_span!(
            "process_intent",
            category = %intent.category,
            target = %intent.target,
        );
        let _guard = span.enter();

        let Some(action) = self.actions.resolve(intent, world) else {
            tracing::info!("no action accepted the intent");
            let result = ExecutionResult::failure(
                intent.action.clone(),
                format!("no action available for {} intent", intent.category),
            );
            self.history.push(ExecutionRecord::from_outcome(
                intent,
                None,
                &result,
                started.elapsed(),
            ));
            return result;
        };
        let action_name = action.name().to_string();

        let result = {
            let mut txn = StateTransaction::begin(world, &self.managers);
            match action.execute(intent, &mut txn, self.roller.as_mut()) {
                Ok(mut result) if result.success => {
                    result.state_changes = txn.commit();
                    result
                }
                Ok(result) => {
                    drop(txn);
                    result
                }
                Err(err) => {
                    drop(txn);
                    tracing::warn!(action = %action_name, error = %err, "action faulted");
                    ExecutionResult::failure(intent.action.clone(), err.to_string())
                }
            }
        };

        tracing::info!(
            action = %action_name,
            success = result.success,
            changes = result.state_changes.len(),
            "intent processed"
        );
        self.history.push(ExecutionRecord::from_outcome(
            intent,
            Some(action_name),
            &result,
            started.elapsed(),
        ));
        result
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        ExecutionEngine::new()
    }
}
