//! The mutable game world: player, NPCs, locations, global environment.
//!
//! The world is a plain data structure handed explicitly into every call;
//! nothing in it is global. During action execution the open transaction
//! holds the only mutable handle, so reads and writes cannot interleave.
//! Collections are ordered maps, keeping fuzzy-match and path-search
//! tie-breaks deterministic.

use crate::intent::fuzzy_match;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Player
// ============================================================================

/// A named attribute with its legal range (e.g. strength 10 in 1..=20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

impl AttributeDef {
    pub fn new(value: i64, min: i64, max: i64) -> Self {
        AttributeDef { value, min, max }
    }

    /// Standard attribute: base 10, range 1..=20.
    pub fn standard() -> Self {
        AttributeDef::new(10, 1, 20)
    }

    pub fn clamp(&self, candidate: i64) -> i64 {
        candidate.clamp(self.min, self.max)
    }
}

/// Bounded bag of carried item names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub items: Vec<String>,
    pub capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Inventory {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|i| i.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position_of(name).is_some()
    }
}

/// The player character's mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub hp: i64,
    pub max_hp: i64,
    pub mp: i64,
    pub max_mp: i64,
    pub alive: bool,
    /// Id of the location the player currently occupies.
    pub location: String,
    pub inventory: Inventory,
    pub attributes: BTreeMap<String, AttributeDef>,
}

impl PlayerState {
    pub fn new(name: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        for attr in ["strength", "dexterity", "intelligence", "constitution"] {
            attributes.insert(attr.to_string(), AttributeDef::standard());
        }
        PlayerState {
            name: name.into(),
            hp: 20,
            max_hp: 20,
            mp: 10,
            max_mp: 10,
            alive: true,
            location: String::new(),
            inventory: Inventory::new(10),
            attributes,
        }
    }

    pub fn with_hp(mut self, hp: i64, max_hp: i64) -> Self {
        self.hp = hp;
        self.max_hp = max_hp;
        self
    }

    pub fn with_mp(mut self, mp: i64, max_mp: i64) -> Self {
        self.mp = mp;
        self.max_mp = max_mp;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, def: AttributeDef) -> Self {
        self.attributes.insert(name.into(), def);
        self
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.inventory.items.push(item.into());
        self
    }
}

// ============================================================================
// NPCs
// ============================================================================

/// Broad role an NPC plays, driving dialogue and trade eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcRole {
    Villager,
    Merchant,
    Monster,
}

impl NpcRole {
    /// Whether this role will hold a conversation.
    pub fn is_talkative(&self) -> bool {
        !matches!(self, NpcRole::Monster)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NpcRole::Villager => "villager",
            NpcRole::Merchant => "merchant",
            NpcRole::Monster => "monster",
        }
    }
}

impl fmt::Display for NpcRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcState {
    pub name: String,
    pub hp: i64,
    pub max_hp: i64,
    pub alive: bool,
    pub location: String,
    pub role: NpcRole,
    /// Carried items; for merchants this is the stock offered in trade.
    #[serde(default)]
    pub inventory: Vec<String>,
}

impl NpcState {
    pub fn new(name: impl Into<String>, role: NpcRole) -> Self {
        NpcState {
            name: name.into(),
            hp: 10,
            max_hp: 10,
            alive: true,
            location: String::new(),
            role,
            inventory: Vec::new(),
        }
    }

    pub fn with_hp(mut self, hp: i64, max_hp: i64) -> Self {
        self.hp = hp;
        self.max_hp = max_hp;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_inventory(mut self, items: Vec<String>) -> Self {
        self.inventory = items;
        self
    }
}

// ============================================================================
// Locations and environment
// ============================================================================

/// Compass/vertical direction labelling a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s.trim().to_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exit from a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub direction: Direction,
    /// Destination location id.
    pub to: String,
    pub blocked: bool,
    /// What it takes to pass, quoted verbatim in movement refusals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
}

impl Connection {
    pub fn new(direction: Direction, to: impl Into<String>) -> Self {
        Connection {
            direction,
            to: to.into(),
            blocked: false,
            requirement: None,
        }
    }

    pub fn blocked_by(mut self, requirement: impl Into<String>) -> Self {
        self.blocked = true;
        self.requirement = Some(requirement.into());
        self
    }
}

/// Kind of interactable object found in a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Chest,
    Door,
    Lever,
}

/// An interactable object with open/locked state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    pub name: String,
    pub kind: ObjectKind,
    pub locked: bool,
    pub opened: bool,
}

impl WorldObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        WorldObject {
            name: name.into(),
            kind,
            locked: false,
            opened: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}

/// One node in the location-adjacency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub description: String,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub objects: BTreeMap<String, WorldObject>,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Location {
            name: name.into(),
            description: String::new(),
            connections: Vec::new(),
            objects: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn with_object(mut self, id: impl Into<String>, object: WorldObject) -> Self {
        self.objects.insert(id.into(), object);
        self
    }

    /// The connection leading to `to`, if any.
    pub fn connection_to(&self, to: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.to == to)
    }

    pub fn connection_toward(&self, direction: Direction) -> Option<&Connection> {
        self.connections.iter().find(|c| c.direction == direction)
    }
}

/// World-wide environmental state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub time_of_day: String,
    pub weather: String,
}

impl Default for GlobalState {
    fn default() -> Self {
        GlobalState {
            time_of_day: "day".to_string(),
            weather: "clear".to_string(),
        }
    }
}

// ============================================================================
// Game world
// ============================================================================

/// Complete mutable game state for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameWorld {
    pub player: PlayerState,
    /// NPCs keyed by stable id.
    pub npcs: BTreeMap<String, NpcState>,
    /// Locations keyed by stable id.
    pub locations: BTreeMap<String, Location>,
    #[serde(default)]
    pub global: GlobalState,
}

impl GameWorld {
    pub fn new(player: PlayerState) -> Self {
        GameWorld {
            player,
            npcs: BTreeMap::new(),
            locations: BTreeMap::new(),
            global: GlobalState::default(),
        }
    }

    pub fn add_npc(&mut self, id: impl Into<String>, npc: NpcState) {
        self.npcs.insert(id.into(), npc);
    }

    pub fn add_location(&mut self, id: impl Into<String>, location: Location) {
        self.locations.insert(id.into(), location);
    }

    pub fn npc(&self, id: &str) -> Option<&NpcState> {
        self.npcs.get(id)
    }

    pub fn npc_mut(&mut self, id: &str) -> Option<&mut NpcState> {
        self.npcs.get_mut(id)
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    /// The location the player currently occupies.
    pub fn current_location(&self) -> Option<&Location> {
        self.locations.get(&self.player.location)
    }

    /// Resolve a fuzzy NPC reference to `(id, npc)`.
    ///
    /// Ids are scanned in sorted order; the first id or display name
    /// containing the query (case-insensitive) wins.
    pub fn find_npc(&self, query: &str) -> Option<(&str, &NpcState)> {
        self.npcs
            .iter()
            .find(|(id, npc)| fuzzy_match(query, id) || fuzzy_match(query, &npc.name))
            .map(|(id, npc)| (id.as_str(), npc))
    }

    /// Resolve a fuzzy location reference to `(id, location)`.
    pub fn find_location(&self, query: &str) -> Option<(&str, &Location)> {
        self.locations
            .iter()
            .find(|(id, loc)| fuzzy_match(query, id) || fuzzy_match(query, &loc.name))
            .map(|(id, loc)| (id.as_str(), loc))
    }

    /// Resolve a fuzzy object reference within one location to `(object_id, object)`.
    pub fn find_object_at<'a>(
        &'a self,
        location_id: &str,
        query: &str,
    ) -> Option<(&'a str, &'a WorldObject)> {
        self.locations.get(location_id).and_then(|loc| {
            loc.objects
                .iter()
                .find(|(id, obj)| fuzzy_match(query, id) || fuzzy_match(query, &obj.name))
                .map(|(id, obj)| (id.as_str(), obj))
        })
    }

    /// NPCs present at a location, in id order.
    pub fn npcs_at(&self, location_id: &str) -> Vec<(&str, &NpcState)> {
        self.npcs
            .iter()
            .filter(|(_, npc)| npc.location == location_id)
            .map(|(id, npc)| (id.as_str(), npc))
            .collect()
    }
}
