//! Test doubles and fixtures.
//!
//! Public so downstream crates can script engine behavior in their own
//! tests: [`FixedRoller`] replaces randomness with a known sequence, and
//! [`sample_world`] is a small connected world with one of everything the
//! built-in actions touch.

use crate::dice::{DiceExpression, DiceRoll, DiceRoller};
use crate::world::{
    Connection, Direction, GameWorld, Location, NpcRole, NpcState, ObjectKind, PlayerState,
    WorldObject,
};
use std::collections::VecDeque;

/// Roller that returns a scripted sequence of raw results.
///
/// Each `roll` pops the next scripted value as the raw dice sum; the
/// expression's modifier is applied on top as usual. When the script runs
/// out, rolls come up minimum (every die shows 1).
pub struct FixedRoller {
    results: VecDeque<i32>,
}

impl FixedRoller {
    pub fn new(results: Vec<i32>) -> Self {
        FixedRoller {
            results: results.into(),
        }
    }

    /// For actions that are not expected to roll at all.
    pub fn empty() -> Self {
        FixedRoller {
            results: VecDeque::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.results.len()
    }
}

impl DiceRoller for FixedRoller {
    fn roll(&mut self, name: &str, expr: &DiceExpression) -> DiceRoll {
        let raw = self.results.pop_front().unwrap_or(expr.count as i32);
        DiceRoll {
            name: name.to_string(),
            dice_type: expr.dice_notation(),
            result: raw,
            modifier: expr.modifier,
        }
    }
}

/// A five-location village world.
///
/// ```text
///                village_tavern        (Old Tom, villager)
///                      |
/// mountain_path == village_center -- dark_forest -- abandoned_cave
///  (blocked:        (Mira,            (goblin_01)    (chest_01,
///   climbing gear)   merchant)                        locked door_01)
/// ```
pub fn sample_world() -> GameWorld {
    let mut world = GameWorld::new(PlayerState::new("Arin").with_location("village_center"));

    world.add_location(
        "village_center",
        Location::new("Village Center")
            .with_description("A cobbled square ringed by market stalls.")
            .with_connection(Connection::new(Direction::North, "village_tavern"))
            .with_connection(Connection::new(Direction::East, "dark_forest"))
            .with_connection(
                Connection::new(Direction::West, "mountain_path").blocked_by("climbing gear"),
            ),
    );
    world.add_location(
        "village_tavern",
        Location::new("Village Tavern")
            .with_description("Warm light and the smell of stew.")
            .with_connection(Connection::new(Direction::South, "village_center")),
    );
    world.add_location(
        "dark_forest",
        Location::new("Dark Forest")
            .with_description("Close trees and closer shadows.")
            .with_connection(Connection::new(Direction::West, "village_center"))
            .with_connection(Connection::new(Direction::East, "abandoned_cave")),
    );
    world.add_location(
        "abandoned_cave",
        Location::new("Abandoned Cave")
            .with_description("Dripping stone and old camp debris.")
            .with_connection(Connection::new(Direction::West, "dark_forest"))
            .with_object("chest_01", WorldObject::new("Old Chest", ObjectKind::Chest))
            .with_object(
                "door_01",
                WorldObject::new("Iron Door", ObjectKind::Door).locked(),
            ),
    );
    world.add_location(
        "mountain_path",
        Location::new("Mountain Path")
            .with_description("A scree slope climbing into cloud.")
            .with_connection(Connection::new(Direction::East, "village_center")),
    );

    world.add_npc(
        "goblin_01",
        NpcState::new("Forest Goblin", NpcRole::Monster)
            .with_hp(6, 6)
            .with_location("dark_forest"),
    );
    world.add_npc(
        "mira",
        NpcState::new("Mira", NpcRole::Merchant)
            .with_location("village_center")
            .with_inventory(vec![
                "healing potion".to_string(),
                "rope".to_string(),
                "torch".to_string(),
            ]),
    );
    world.add_npc(
        "old_tom",
        NpcState::new("Old Tom", NpcRole::Villager).with_location("village_tavern"),
    );

    world
}

#[track_caller]
pub fn assert_player_hp(world: &GameWorld, expected: i64) {
    assert_eq!(world.player.hp, expected, "player hp");
}

#[track_caller]
pub fn assert_player_mp(world: &GameWorld, expected: i64) {
    assert_eq!(world.player.mp, expected, "player mp");
}

#[track_caller]
pub fn assert_player_location(world: &GameWorld, expected: &str) {
    assert_eq!(world.player.location, expected, "player location");
}

#[track_caller]
pub fn assert_npc_hp(world: &GameWorld, id: &str, expected: i64) {
    let npc = world
        .npc(id)
        .unwrap_or_else(|| panic!("no npc with id {id}"));
    assert_eq!(npc.hp, expected, "hp of {id}");
}

#[track_caller]
pub fn assert_npc_alive(world: &GameWorld, id: &str, expected: bool) {
    let npc = world
        .npc(id)
        .unwrap_or_else(|| panic!("no npc with id {id}"));
    assert_eq!(npc.alive, expected, "alive flag of {id}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DieType;

    #[test]
    fn test_fixed_roller_pops_in_order() {
        let expr = DiceExpression::new(1, DieType::D6, 2);
        let mut roller = FixedRoller::new(vec![4, 1]);

        assert_eq!(roller.roll("first", &expr).total(), 6);
        assert_eq!(roller.roll("second", &expr).total(), 3);
        assert_eq!(roller.remaining(), 0);
        // Exhausted script falls back to the minimum raw roll.
        assert_eq!(roller.roll("third", &expr).total(), 3);
    }

    #[test]
    fn test_sample_world_is_internally_consistent() {
        let world = sample_world();

        assert_player_hp(&world, 20);
        assert_player_mp(&world, 10);
        assert_player_location(&world, "village_center");
        assert_npc_hp(&world, "goblin_01", 6);
        assert_npc_alive(&world, "goblin_01", true);

        // Every connection points at a real location.
        for (id, location) in &world.locations {
            for connection in &location.connections {
                assert!(
                    world.locations.contains_key(&connection.to),
                    "{id} connects to unknown {}",
                    connection.to
                );
            }
        }
        // Every NPC stands somewhere real.
        for (id, npc) in &world.npcs {
            assert!(
                world.locations.contains_key(&npc.location),
                "{id} placed at unknown {}",
                npc.location
            );
        }
    }
}
