//! Built-in action catalog.
//!
//! Eight actions covering the core mechanics: attack, search, dialogue,
//! trade, move, status, interact, and skill. Each performs its mutations
//! through the transaction it is handed and defers creative content (what was
//! found, what was said) to the narrative layer via result metadata.
//!
//! Check-based actions report a missed roll as a failed result: the roll is
//! attached, `failure_reason` says what fell flat, and the engine never
//! commits it, so anything proposed before the miss rolls back.

use super::{Action, ActionError};
use crate::dice::{DiceExpression, DiceRoller, DieType};
use crate::intent::{Intent, IntentCategory};
use crate::outcome::{metadata_keys, ExecutionResult};
use crate::state::{EnvironmentManager, MoveBlocked, StateOperationRequest};
use crate::transaction::StateTransaction;
use crate::world::{Direction, GameWorld, NpcRole};
use serde_json::{json, Map, Value};
use std::sync::Arc;

// ============================================================================
// Tuning constants
// ============================================================================

/// Damage dealt by a basic attack.
pub const ATTACK_DAMAGE: DiceExpression = DiceExpression::new(1, DieType::D6, 2);
/// Search perception check and its difficulty.
pub const SEARCH_CHECK: DiceExpression = DiceExpression::new(1, DieType::D20, 0);
pub const SEARCH_DC: i32 = 10;
/// Interaction check (opening, pulling, prying) and its difficulty.
pub const INTERACT_CHECK: DiceExpression = DiceExpression::new(1, DieType::D20, 0);
pub const INTERACT_DC: i32 = 12;
/// General skill check and its difficulty.
pub const SKILL_CHECK: DiceExpression = DiceExpression::new(1, DieType::D20, 2);
pub const SKILL_DC: i32 = 10;
/// HP restored by a successful healing skill.
pub const HEALING_AMOUNT: DiceExpression = DiceExpression::new(1, DieType::D8, 2);

/// The built-in actions in their standard registration order.
pub fn default_actions() -> Vec<Arc<dyn Action>> {
    vec![
        Arc::new(AttackAction),
        Arc::new(SearchAction),
        Arc::new(DialogueAction),
        Arc::new(TradeAction),
        Arc::new(MoveAction),
        Arc::new(StatusAction),
        Arc::new(InteractAction),
        Arc::new(SkillAction),
    ]
}

// ============================================================================
// Attack
// ============================================================================

/// Deal [`ATTACK_DAMAGE`] to a named NPC. Declines intents with no target;
/// the classifier must not guess one.
pub struct AttackAction;

impl Action for AttackAction {
    fn name(&self) -> &str {
        "attack"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Attack]
    }

    fn can_execute(&self, intent: &Intent, _world: &GameWorld) -> bool {
        !intent.target.is_unspecified()
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let Some(query) = intent.target.name() else {
            return Ok(ExecutionResult::failure("attack", "no target specified"));
        };
        let (id, name, alive) = match txn.world().find_npc(query) {
            Some((id, npc)) => (id.to_string(), npc.name.clone(), npc.alive),
            None => {
                return Ok(ExecutionResult::failure(
                    format!("attack {query}"),
                    format!("no such target: {query}"),
                ))
            }
        };
        if !alive {
            return Ok(ExecutionResult::failure(
                format!("attack {name}"),
                format!("{name} is already dead"),
            ));
        }

        let roll = dice.roll("attack damage", &ATTACK_DAMAGE);
        txn.add_change(StateOperationRequest::subtract(
            id.as_str(),
            "hp",
            json!(roll.total()),
            "attack damage",
        ))?;
        // The kill, if any, has already cascaded onto the alive flag.
        let defeated = txn.world().npc(&id).map(|npc| !npc.alive).unwrap_or(false);

        Ok(ExecutionResult::success(format!("attack {name}"))
            .with_roll(roll)
            .with_metadata(metadata_keys::ATTACK_TARGET, json!(id))
            .with_metadata(metadata_keys::TARGET_DEFEATED, json!(defeated))
            .flag_ai_content())
    }
}

// ============================================================================
// Search
// ============================================================================

/// Roll [`SEARCH_CHECK`] against [`SEARCH_DC`]. A miss fails the search
/// outright; what a successful search turns up is authored by the narrative
/// layer, so the result carries no state changes either way.
pub struct SearchAction;

impl Action for SearchAction {
    fn name(&self) -> &str {
        "search"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Search]
    }

    fn can_execute(&self, _intent: &Intent, _world: &GameWorld) -> bool {
        true
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let target_name = match intent.target.name() {
            Some(query) => query.to_string(),
            None => {
                let world = txn.world();
                world
                    .current_location()
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|| world.player.location.clone())
            }
        };
        let roll = dice.roll("search check", &SEARCH_CHECK);
        if !roll.meets_dc(SEARCH_DC) {
            return Ok(ExecutionResult::failure(
                format!("search {target_name}"),
                format!("you comb through {target_name} but find nothing of value"),
            )
            .with_roll(roll));
        }

        Ok(ExecutionResult::success(format!("search {target_name}"))
            .with_roll(roll)
            .with_metadata(metadata_keys::SEARCH_TARGET, json!(target_name))
            .flag_ai_content())
    }
}

// ============================================================================
// Dialogue
// ============================================================================

/// Open a conversation with a living, talkative NPC. What gets said is
/// authored downstream; this only establishes who is being addressed.
pub struct DialogueAction;

impl Action for DialogueAction {
    fn name(&self) -> &str {
        "dialogue"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Dialogue]
    }

    fn can_execute(&self, intent: &Intent, world: &GameWorld) -> bool {
        intent
            .target
            .name()
            .and_then(|query| world.find_npc(query))
            .map(|(_, npc)| npc.alive && npc.role.is_talkative())
            .unwrap_or(false)
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        _dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let Some(query) = intent.target.name() else {
            return Ok(ExecutionResult::failure("talk", "no one to talk to"));
        };
        let world = txn.world();
        let Some((id, npc)) = world.find_npc(query) else {
            return Ok(ExecutionResult::failure(
                format!("talk to {query}"),
                format!("no such character: {query}"),
            ));
        };
        if !npc.alive {
            return Ok(ExecutionResult::failure(
                format!("talk to {}", npc.name),
                format!("{} is dead", npc.name),
            ));
        }
        if !npc.role.is_talkative() {
            return Ok(ExecutionResult::failure(
                format!("talk to {}", npc.name),
                format!("{} has nothing to say", npc.name),
            ));
        }

        Ok(ExecutionResult::success(format!("talk to {}", npc.name))
            .with_metadata(metadata_keys::DIALOGUE_TARGET, json!(id))
            .with_metadata(metadata_keys::NPC_ROLE, json!(npc.role.as_str()))
            .flag_ai_content())
    }
}

// ============================================================================
// Trade
// ============================================================================

/// Open a trade with a living merchant, exposing their stock to the
/// narrative layer. Prices and haggling are authored downstream.
pub struct TradeAction;

impl Action for TradeAction {
    fn name(&self) -> &str {
        "trade"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Trade]
    }

    fn can_execute(&self, intent: &Intent, world: &GameWorld) -> bool {
        intent
            .target
            .name()
            .and_then(|query| world.find_npc(query))
            .map(|(_, npc)| npc.alive && npc.role == NpcRole::Merchant)
            .unwrap_or(false)
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        _dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let Some(query) = intent.target.name() else {
            return Ok(ExecutionResult::failure("trade", "no one to trade with"));
        };
        let world = txn.world();
        let Some((id, npc)) = world.find_npc(query) else {
            return Ok(ExecutionResult::failure(
                format!("trade with {query}"),
                format!("no such trader: {query}"),
            ));
        };
        if !npc.alive {
            return Ok(ExecutionResult::failure(
                format!("trade with {}", npc.name),
                format!("{} is dead", npc.name),
            ));
        }
        if npc.role != NpcRole::Merchant {
            return Ok(ExecutionResult::failure(
                format!("trade with {}", npc.name),
                format!("{} is not a merchant", npc.name),
            ));
        }

        Ok(ExecutionResult::success(format!("trade with {}", npc.name))
            .with_metadata(metadata_keys::TRADE_TARGET, json!(id))
            .with_metadata(metadata_keys::MERCHANT_INVENTORY, json!(npc.inventory))
            .flag_ai_content())
    }
}

// ============================================================================
// Move
// ============================================================================

/// Move the player along a direct, unblocked connection. The destination
/// comes from the intent target (fuzzy location name) or a `direction`
/// parameter. Refusals distinguish unknown places, blocked ways, reachable
/// but non-adjacent destinations, and unreachable ones.
pub struct MoveAction;

impl Action for MoveAction {
    fn name(&self) -> &str {
        "move"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Move]
    }

    fn can_execute(&self, intent: &Intent, _world: &GameWorld) -> bool {
        !intent.target.is_unspecified() || intent.parameter_str("direction").is_some()
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        _dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let world = txn.world();
        let from = world.player.location.clone();

        let destination = if let Some(query) = intent.target.name() {
            match world.find_location(query) {
                Some((id, _)) => id.to_string(),
                None => {
                    return Ok(ExecutionResult::failure(
                        format!("move to {query}"),
                        format!("unknown destination: {query}"),
                    ))
                }
            }
        } else if let Some(raw) = intent.parameter_str("direction") {
            let Some(direction) = Direction::parse(raw) else {
                return Ok(ExecutionResult::failure(
                    "move",
                    format!("unknown direction: {raw}"),
                ));
            };
            match world
                .current_location()
                .and_then(|l| l.connection_toward(direction))
            {
                Some(connection) => connection.to.clone(),
                None => {
                    return Ok(ExecutionResult::failure(
                        format!("move {direction}"),
                        format!("nothing lies {direction} of here"),
                    ))
                }
            }
        } else {
            return Ok(ExecutionResult::failure("move", "no destination given"));
        };

        let dest_name = world
            .location(&destination)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| destination.clone());
        let env = EnvironmentManager;
        if let Err(blocked) = env.can_move(world, &from, &destination) {
            let reason = match blocked {
                MoveBlocked::NotAdjacent { .. } => {
                    // A route may still exist through other locations.
                    match env.find_path(world, &from, &destination) {
                        Some(path) => {
                            let hop = path
                                .get(1)
                                .and_then(|id| world.location(id))
                                .map(|l| l.name.clone())
                                .unwrap_or_else(|| dest_name.clone());
                            format!("{dest_name} is not adjacent; head to {hop} first")
                        }
                        None => format!("no path leads to {dest_name}"),
                    }
                }
                other => other.to_string(),
            };
            return Ok(ExecutionResult::failure(
                format!("move to {dest_name}"),
                reason,
            ));
        }

        txn.add_change(StateOperationRequest::set(
            "player",
            "location",
            json!(destination),
            format!("moved to {dest_name}"),
        ))?;

        Ok(ExecutionResult::success(format!("move to {dest_name}"))
            .with_metadata(metadata_keys::MOVEMENT_TARGET, json!(destination))
            .flag_ai_content())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Read-only snapshot of the player's condition, attached under
/// [`metadata_keys::STATUS`] for the narrative layer to phrase.
pub struct StatusAction;

impl Action for StatusAction {
    fn name(&self) -> &str {
        "status"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Status]
    }

    fn can_execute(&self, _intent: &Intent, _world: &GameWorld) -> bool {
        true
    }

    fn execute(
        &self,
        _intent: &Intent,
        txn: &mut StateTransaction<'_>,
        _dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let world = txn.world();
        let player = &world.player;
        let location_name = world
            .current_location()
            .map(|l| l.name.clone())
            .unwrap_or_else(|| player.location.clone());
        let attributes: Map<String, Value> = player
            .attributes
            .iter()
            .map(|(name, def)| (name.clone(), json!(def.value)))
            .collect();
        let snapshot = json!({
            "name": player.name,
            "hp": player.hp,
            "max_hp": player.max_hp,
            "mp": player.mp,
            "max_mp": player.max_mp,
            "alive": player.alive,
            "location": player.location,
            "location_name": location_name,
            "inventory": player.inventory.items,
            "attributes": attributes,
        });

        Ok(ExecutionResult::success("check status")
            .with_metadata(metadata_keys::STATUS, snapshot)
            .flag_ai_content())
    }
}

// ============================================================================
// Interact
// ============================================================================

/// Try to open or operate an object at the player's location: roll
/// [`INTERACT_CHECK`] against [`INTERACT_DC`], then propose the `opened`
/// flag. Locked objects are not pre-checked here; the environment manager's
/// rejection fails the attempt.
pub struct InteractAction;

impl Action for InteractAction {
    fn name(&self) -> &str {
        "interact"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Interact]
    }

    fn can_execute(&self, intent: &Intent, _world: &GameWorld) -> bool {
        !intent.target.is_unspecified()
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let Some(query) = intent.target.name() else {
            return Ok(ExecutionResult::failure(
                "interact",
                "nothing to interact with",
            ));
        };
        let world = txn.world();
        let location_id = world.player.location.clone();
        let (id, name, opened) = match world.find_object_at(&location_id, query) {
            Some((id, object)) => (id.to_string(), object.name.clone(), object.opened),
            None => {
                return Ok(ExecutionResult::failure(
                    format!("interact with {query}"),
                    format!("no such object here: {query}"),
                ))
            }
        };
        if opened {
            return Ok(ExecutionResult::failure(
                format!("interact with {name}"),
                format!("{name} is already open"),
            ));
        }

        let roll = dice.roll("interact check", &INTERACT_CHECK);
        if !roll.meets_dc(INTERACT_DC) {
            return Ok(ExecutionResult::failure(
                format!("interact with {name}"),
                format!("{name} does not budge"),
            )
            .with_roll(roll));
        }

        txn.add_change(StateOperationRequest::set(
            id.as_str(),
            "opened",
            json!(true),
            format!("opened {name}"),
        ))?;

        Ok(ExecutionResult::success(format!("interact with {name}"))
            .with_roll(roll)
            .with_metadata(metadata_keys::INTERACTION_TARGET, json!(id))
            .flag_ai_content())
    }
}

// ============================================================================
// Skill
// ============================================================================

const HEALING_KEYWORDS: [&str; 4] = ["heal", "cure", "mend", "restore"];

fn is_healing(action: &str) -> bool {
    let lowered = action.to_lowercase();
    HEALING_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// General skill attempt: spend the `mp_cost` parameter (if any), roll
/// [`SKILL_CHECK`] against [`SKILL_DC`], and on a passed check apply the
/// skill's mechanical effect. Healing skills (named by keyword) restore
/// [`HEALING_AMOUNT`] HP; everything else is narrated downstream.
///
/// A missed check fails the attempt; failed results are never committed, so
/// the proposed mana spend rolls back with everything else. A cost the
/// player cannot cover fails the whole attempt before any roll.
pub struct SkillAction;

impl Action for SkillAction {
    fn name(&self) -> &str {
        "skill"
    }

    fn categories(&self) -> &[IntentCategory] {
        &[IntentCategory::Skill]
    }

    fn can_execute(&self, _intent: &Intent, _world: &GameWorld) -> bool {
        true
    }

    fn execute(
        &self,
        intent: &Intent,
        txn: &mut StateTransaction<'_>,
        dice: &mut dyn DiceRoller,
    ) -> Result<ExecutionResult, ActionError> {
        let mp_cost = intent.parameter_i64("mp_cost").unwrap_or(0);
        if mp_cost > 0 {
            txn.add_change(StateOperationRequest::subtract(
                "player",
                "mp",
                json!(mp_cost),
                format!("mp cost of {}", intent.action),
            ))?;
        }

        let roll = dice.roll("skill check", &SKILL_CHECK);
        if !roll.meets_dc(SKILL_DC) {
            return Ok(ExecutionResult::failure(
                format!("attempt {}", intent.action),
                format!("{} fizzles", intent.action),
            )
            .with_roll(roll));
        }

        let mut result = ExecutionResult::success(intent.action.clone())
            .with_roll(roll)
            .with_metadata(metadata_keys::SKILL_NAME, json!(intent.action))
            .flag_ai_content();
        if let Some(target) = intent.target.name() {
            result = result.with_metadata(metadata_keys::SKILL_TARGET, json!(target));
        }

        if is_healing(&intent.action) {
            let healing = dice.roll("healing", &HEALING_AMOUNT);
            txn.add_change(StateOperationRequest::add(
                "player",
                "hp",
                json!(healing.total()),
                format!("healed by {}", intent.action),
            ))?;
            result = result.with_roll(healing);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateManagerRegistry;
    use crate::testing::{sample_world, FixedRoller};
    use crate::transaction::TransactionError;

    #[test]
    fn test_attack_damages_and_reports_defeat() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![4]); // 4 + 2 = 6 damage
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Attack, "strike the goblin")
            .with_target("goblin");
        let result = AttackAction.execute(&intent, &mut txn, &mut dice).unwrap();
        txn.commit();

        assert!(result.success);
        assert_eq!(result.dice_rolls[0].total(), 6);
        assert_eq!(
            result.metadata.get(metadata_keys::ATTACK_TARGET),
            Some(&json!("goblin_01"))
        );
        assert_eq!(
            result.metadata.get(metadata_keys::TARGET_DEFEATED),
            Some(&json!(true))
        );
        assert_eq!(world.npcs["goblin_01"].hp, 0);
        assert!(!world.npcs["goblin_01"].alive);
    }

    #[test]
    fn test_attack_survivor_not_defeated() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![1]); // 1 + 2 = 3 damage
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Attack, "poke the goblin").with_target("goblin");
        let result = AttackAction.execute(&intent, &mut txn, &mut dice).unwrap();
        txn.commit();

        assert_eq!(
            result.metadata.get(metadata_keys::TARGET_DEFEATED),
            Some(&json!(false))
        );
        assert_eq!(world.npcs["goblin_01"].hp, 3);
        assert!(world.npcs["goblin_01"].alive);
    }

    #[test]
    fn test_attack_requires_target() {
        let world = sample_world();
        let intent = Intent::new(IntentCategory::Attack, "swing wildly");
        assert!(!AttackAction.can_execute(&intent, &world));

        let named = intent.clone().with_target("goblin");
        assert!(AttackAction.can_execute(&named, &world));
    }

    #[test]
    fn test_attack_unknown_target_changes_nothing() {
        let mut world = sample_world();
        let before = world.clone();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![4]);
        {
            let mut txn = StateTransaction::begin(&mut world, &managers);
            let intent =
                Intent::new(IntentCategory::Attack, "slay the dragon").with_target("dragon");
            let result = AttackAction.execute(&intent, &mut txn, &mut dice).unwrap();
            assert!(!result.success);
            assert_eq!(
                result.failure_reason.as_deref(),
                Some("no such target: dragon")
            );
            assert!(txn.changes().is_empty());
        }
        assert_eq!(world, before);
    }

    #[test]
    fn test_search_failed_check_reports_failure() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![5]); // 5 misses DC 10
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Search, "look around");
        let result = SearchAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(!result.success);
        // Unnamed target falls back to the current location.
        let reason = result.failure_reason.as_deref().unwrap();
        assert!(reason.contains("Village Center"));
        assert!(reason.contains("nothing of value"));
        assert_eq!(result.dice_rolls.len(), 1);
        assert!(result.state_changes.is_empty());
        assert!(!result.requires_ai_content());
    }

    #[test]
    fn test_search_named_target_passes_check() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![15]);
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Search, "search the bar").with_target("the bar");
        let result = SearchAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(result.success);
        assert_eq!(
            result.metadata.get(metadata_keys::SEARCH_TARGET),
            Some(&json!("the bar"))
        );
        assert!(result.requires_ai_content());
    }

    #[test]
    fn test_dialogue_accepts_only_living_talkative_npcs() {
        let world = sample_world();
        let talk_to = |name: &str| {
            Intent::new(IntentCategory::Dialogue, format!("talk to {name}")).with_target(name)
        };

        assert!(DialogueAction.can_execute(&talk_to("old tom"), &world));
        assert!(DialogueAction.can_execute(&talk_to("mira"), &world));
        assert!(!DialogueAction.can_execute(&talk_to("goblin"), &world));
        assert!(!DialogueAction.can_execute(&talk_to("nobody"), &world));
    }

    #[test]
    fn test_dialogue_reports_npc_role() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent =
            Intent::new(IntentCategory::Dialogue, "greet old tom").with_target("old tom");
        let result = DialogueAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(result.success);
        assert_eq!(
            result.metadata.get(metadata_keys::DIALOGUE_TARGET),
            Some(&json!("old_tom"))
        );
        assert_eq!(
            result.metadata.get(metadata_keys::NPC_ROLE),
            Some(&json!("villager"))
        );
    }

    #[test]
    fn test_dialogue_with_monster_fails_gracefully() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Dialogue, "taunt").with_target("goblin");
        let result = DialogueAction.execute(&intent, &mut txn, &mut dice).unwrap();
        assert!(!result.success);
        assert!(result
            .failure_reason
            .unwrap()
            .contains("has nothing to say"));
    }

    #[test]
    fn test_trade_exposes_merchant_stock() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Trade, "browse wares").with_target("mira");
        let result = TradeAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(result.success);
        assert_eq!(
            result.metadata.get(metadata_keys::MERCHANT_INVENTORY),
            Some(&json!(["healing potion", "rope", "torch"]))
        );
    }

    #[test]
    fn test_trade_rejects_non_merchant() {
        let mut world = sample_world();
        let intent = Intent::new(IntentCategory::Trade, "barter").with_target("old tom");
        assert!(!TradeAction.can_execute(&intent, &world));

        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);
        let result = TradeAction.execute(&intent, &mut txn, &mut dice).unwrap();
        assert!(!result.success);
        assert!(result.failure_reason.unwrap().contains("not a merchant"));
    }

    #[test]
    fn test_move_to_adjacent_location() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Move, "go to the tavern").with_target("tavern");
        let result = MoveAction.execute(&intent, &mut txn, &mut dice).unwrap();
        txn.commit();

        assert!(result.success);
        assert_eq!(
            result.metadata.get(metadata_keys::MOVEMENT_TARGET),
            Some(&json!("village_tavern"))
        );
        assert_eq!(world.player.location, "village_tavern");
    }

    #[test]
    fn test_move_by_direction_parameter() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent =
            Intent::new(IntentCategory::Move, "head north").with_parameter("direction", json!("north"));
        let result = MoveAction.execute(&intent, &mut txn, &mut dice).unwrap();
        txn.commit();

        assert!(result.success);
        assert_eq!(world.player.location, "village_tavern");
    }

    #[test]
    fn test_move_blocked_quotes_requirement() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Move, "climb west").with_target("mountain");
        let result = MoveAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(!result.success);
        assert!(result.failure_reason.unwrap().contains("climbing gear"));
    }

    #[test]
    fn test_move_far_destination_suggests_next_hop() {
        let mut world = sample_world();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Move, "go to the cave").with_target("cave");
        let result = MoveAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(!result.success);
        let reason = result.failure_reason.unwrap();
        assert!(reason.contains("not adjacent"), "{reason}");
        assert!(reason.contains("Dark Forest"), "{reason}");
    }

    #[test]
    fn test_move_unreachable_destination() {
        let mut world = sample_world();
        world.add_location("island", crate::world::Location::new("Distant Island"));
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Move, "swim out").with_target("island");
        let result = MoveAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(!result.success);
        assert!(result.failure_reason.unwrap().contains("no path leads to"));
    }

    #[test]
    fn test_status_snapshot() {
        let mut world = sample_world();
        world.player.hp = 14;
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Status, "how am I doing");
        let result = StatusAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(result.success);
        assert!(result.state_changes.is_empty());
        let status = result.metadata.get(metadata_keys::STATUS).unwrap();
        assert_eq!(status["hp"], json!(14));
        assert_eq!(status["location_name"], json!("Village Center"));
        assert_eq!(status["attributes"]["strength"], json!(10));
    }

    #[test]
    fn test_interact_opens_chest_on_passed_check() {
        let mut world = sample_world();
        world.player.location = "abandoned_cave".to_string();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![15]);
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Interact, "open the chest").with_target("chest");
        let result = InteractAction.execute(&intent, &mut txn, &mut dice).unwrap();
        txn.commit();

        assert!(result.success);
        assert_eq!(
            result.metadata.get(metadata_keys::INTERACTION_TARGET),
            Some(&json!("chest_01"))
        );
        assert!(world.locations["abandoned_cave"].objects["chest_01"].opened);
    }

    #[test]
    fn test_interact_failed_check_leaves_object_alone() {
        let mut world = sample_world();
        world.player.location = "abandoned_cave".to_string();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![5]);
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Interact, "open the chest").with_target("chest");
        let result = InteractAction.execute(&intent, &mut txn, &mut dice).unwrap();

        assert!(!result.success);
        assert!(result.failure_reason.unwrap().contains("does not budge"));
        assert_eq!(result.dice_rolls.len(), 1);
        assert!(txn.changes().is_empty());
    }

    #[test]
    fn test_interact_locked_object_is_rejected() {
        let mut world = sample_world();
        world.player.location = "abandoned_cave".to_string();
        let before = world.clone();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![15]);
        {
            let mut txn = StateTransaction::begin(&mut world, &managers);
            let intent =
                Intent::new(IntentCategory::Interact, "open the door").with_target("door");
            let err = InteractAction
                .execute(&intent, &mut txn, &mut dice)
                .unwrap_err();
            assert!(matches!(
                err,
                ActionError::Transaction(TransactionError::Rejected { .. })
            ));
            assert!(err.to_string().contains("locked"));
        }
        assert_eq!(world, before);
    }

    #[test]
    fn test_interact_already_open() {
        let mut world = sample_world();
        world.player.location = "abandoned_cave".to_string();
        if let Some(location) = world.locations.get_mut("abandoned_cave") {
            if let Some(chest) = location.objects.get_mut("chest_01") {
                chest.opened = true;
            }
        }
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::empty();
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Interact, "open the chest").with_target("chest");
        let result = InteractAction.execute(&intent, &mut txn, &mut dice).unwrap();
        assert!(!result.success);
        assert!(result.failure_reason.unwrap().contains("already open"));
    }

    #[test]
    fn test_skill_heals_on_passed_check() {
        let mut world = sample_world();
        world.player.hp = 12;
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![12, 6]); // check 12+2, healing 6+2
        let mut txn = StateTransaction::begin(&mut world, &managers);

        let intent = Intent::new(IntentCategory::Skill, "cast a healing spell")
            .with_target("self")
            .with_parameter("mp_cost", json!(4));
        let result = SkillAction.execute(&intent, &mut txn, &mut dice).unwrap();
        txn.commit();

        assert!(result.success);
        assert_eq!(result.dice_rolls.len(), 2);
        assert_eq!(world.player.mp, 6);
        assert_eq!(world.player.hp, 20); // 12 + 8
    }

    #[test]
    fn test_skill_failed_check_rolls_back_mana() {
        let mut world = sample_world();
        world.player.hp = 12;
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![3]); // 3 + 2 = 5, misses DC 10
        {
            let mut txn = StateTransaction::begin(&mut world, &managers);

            let intent = Intent::new(IntentCategory::Skill, "cast a healing spell")
                .with_parameter("mp_cost", json!(4));
            let result = SkillAction.execute(&intent, &mut txn, &mut dice).unwrap();

            assert!(!result.success);
            assert!(result.failure_reason.unwrap().contains("fizzles"));
            assert_eq!(result.dice_rolls.len(), 1);
            // The spend was proposed; dropping the uncommitted transaction
            // restores it.
            assert_eq!(txn.changes().len(), 1);
        }
        assert_eq!(world.player.mp, 10);
        assert_eq!(world.player.hp, 12);
    }

    #[test]
    fn test_skill_insufficient_mana_fails_whole_attempt() {
        let mut world = sample_world();
        let before = world.clone();
        let managers = StateManagerRegistry::with_defaults();
        let mut dice = FixedRoller::new(vec![12]);
        {
            let mut txn = StateTransaction::begin(&mut world, &managers);
            let intent = Intent::new(IntentCategory::Skill, "grand ritual")
                .with_parameter("mp_cost", json!(99));
            let err = SkillAction.execute(&intent, &mut txn, &mut dice).unwrap_err();
            assert!(err.to_string().contains("insufficient mana"));
        }
        assert_eq!(world, before);
    }

    #[test]
    fn test_healing_keywords() {
        assert!(is_healing("cast a Healing spell"));
        assert!(is_healing("restore my strength"));
        assert!(!is_healing("throw a fireball"));
    }

    #[test]
    fn test_default_actions_cover_all_core_categories() {
        let actions = default_actions();
        assert_eq!(actions.len(), 8);
        let names: Vec<&str> = actions.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "attack", "search", "dialogue", "trade", "move", "status", "interact", "skill"
            ]
        );
    }
}
