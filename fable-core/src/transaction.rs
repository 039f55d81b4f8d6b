//! All-or-nothing state transactions.
//!
//! A [`StateTransaction`] holds the only mutable handle to the world while an
//! action runs. Changes apply immediately, so later reads within the same
//! action observe earlier writes; if the transaction is dropped without
//! [`commit`](StateTransaction::commit), the world is restored to the
//! snapshot taken at [`begin`](StateTransaction::begin). Rollback happens in
//! `Drop`, so an action that returns early or panics cannot leave a partial
//! write behind.

use crate::outcome::StateChange;
use crate::state::{StateError, StateManagerRegistry, StateOperationRequest};
use crate::world::GameWorld;
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;
use uuid::Uuid;

/// Most side-effect hops allowed beyond the root change. A chain deeper than
/// this is assumed to be a validation-rule loop and fails the transaction.
pub const MAX_CASCADE_DEPTH: u32 = 8;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("No state manager supports target: {0}")]
    NoManager(String),
    #[error("Change to {target} rejected: {reason}")]
    Rejected { target: String, reason: String },
    #[error("Side-effect cascade exceeded depth {max} (at: {origin})")]
    CascadeDepthExceeded { max: u32, origin: String },
    #[error("{0}")]
    State(#[from] StateError),
}

/// A transactional view over the world for the duration of one action.
pub struct StateTransaction<'w> {
    id: Uuid,
    world: &'w mut GameWorld,
    managers: &'w StateManagerRegistry,
    restore_point: Option<GameWorld>,
    changes: Vec<StateChange>,
    /// Fingerprints of cascaded requests already applied this transaction.
    cascaded: BTreeSet<String>,
    committed: bool,
}

impl<'w> StateTransaction<'w> {
    /// Open a transaction, snapshotting the world for rollback.
    pub fn begin(world: &'w mut GameWorld, managers: &'w StateManagerRegistry) -> Self {
        let id = Uuid::new_v4();
        let restore_point = Some(world.clone());
        tracing::debug!(transaction = %id, "transaction started");
        StateTransaction {
            id,
            world,
            managers,
            restore_point,
            changes: Vec::new(),
            cascaded: BTreeSet::new(),
            committed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Read-only view of the world, including changes applied so far.
    pub fn world(&self) -> &GameWorld {
        self.world
    }

    /// Changes recorded so far, in application order.
    pub fn changes(&self) -> &[StateChange] {
        &self.changes
    }

    /// Manager-routed read of a target's property.
    pub fn current_value(&self, target: &str, property: &str) -> Option<Value> {
        self.managers.current_value(self.world, target, property)
    }

    /// Validate and apply a change, then drain its side-effect cascade
    /// breadth-first. Returns the change recorded for the root request;
    /// cascaded changes are appended to [`changes`](StateTransaction::changes)
    /// behind it.
    ///
    /// A cascaded request whose fingerprint was already applied this
    /// transaction is skipped, so mutually-triggering rules terminate. Any
    /// rejection or structural error fails the whole transaction.
    pub fn add_change(
        &mut self,
        request: StateOperationRequest,
    ) -> Result<StateChange, TransactionError> {
        let (root_change, effects) = self.perform(&request)?;

        let mut queue: VecDeque<(StateOperationRequest, u32)> =
            effects.into_iter().map(|effect| (effect, 1)).collect();
        while let Some((effect, depth)) = queue.pop_front() {
            if depth > MAX_CASCADE_DEPTH {
                return Err(TransactionError::CascadeDepthExceeded {
                    max: MAX_CASCADE_DEPTH,
                    origin: effect.to_string(),
                });
            }
            if !self.cascaded.insert(effect.fingerprint()) {
                continue;
            }
            let (_, follow_ons) = self.perform(&effect)?;
            for follow_on in follow_ons {
                queue.push_back((follow_on, depth + 1));
            }
        }
        Ok(root_change)
    }

    /// Route, validate, and apply a single request.
    fn perform(
        &mut self,
        request: &StateOperationRequest,
    ) -> Result<(StateChange, Vec<StateOperationRequest>), TransactionError> {
        let (domain, manager) = self
            .managers
            .manager_for(self.world, &request.target)
            .ok_or_else(|| TransactionError::NoManager(request.target.clone()))?;
        let verdict = manager.can_perform(self.world, request);
        if !verdict.valid {
            return Err(TransactionError::Rejected {
                target: request.target.clone(),
                reason: verdict
                    .reason
                    .unwrap_or_else(|| "operation not permitted".to_string()),
            });
        }
        let change = manager.apply(self.world, request)?;
        tracing::debug!(transaction = %self.id, domain, change = %change, "applied");
        self.changes.push(change.clone());
        Ok((change, verdict.side_effects))
    }

    /// Make every applied change permanent, returning them in order.
    pub fn commit(mut self) -> Vec<StateChange> {
        self.committed = true;
        self.restore_point = None;
        let changes = std::mem::take(&mut self.changes);
        tracing::debug!(transaction = %self.id, changes = changes.len(), "committed");
        changes
    }

    /// Discard the transaction, restoring the opening snapshot. Equivalent to
    /// dropping without commit; provided for when the intent should be
    /// explicit.
    pub fn rollback(self) {}

    fn restore(&mut self) {
        if let Some(snapshot) = self.restore_point.take() {
            *self.world = snapshot;
            self.changes.clear();
            tracing::debug!(transaction = %self.id, "rolled back");
        }
    }
}

impl Drop for StateTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.restore();
        }
    }
}
