//! Dice rolling for checks and damage.
//!
//! Supports plain notation (`XdY+Z`) and a roller seam so engine tests can
//! script outcomes instead of sampling a real RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice notation parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
}

/// Standard die types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A parsed dice expression (e.g. `2d6+3`): die count, die type, flat modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub count: u32,
    pub die_type: DieType,
    pub modifier: i32,
}

impl DiceExpression {
    pub const fn new(count: u32, die_type: DieType, modifier: i32) -> Self {
        DiceExpression {
            count,
            die_type,
            modifier,
        }
    }

    /// Parse a dice notation string: `1d20`, `d6`, `2d6+3`, `1d8-1`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase().replace(' ', "");
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let d_pos = notation
            .find('d')
            .ok_or_else(|| DiceError::InvalidNotation(notation.clone()))?;
        let count_str = &notation[..d_pos];
        let rest = &notation[d_pos + 1..];

        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?
        };
        if count == 0 {
            return Err(DiceError::NoDice);
        }

        let (sides_str, modifier) = if let Some(pos) = rest.find(|c| c == '+' || c == '-') {
            let value: i32 = rest[pos + 1..]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
            let sign = if rest.as_bytes()[pos] == b'+' { 1 } else { -1 };
            (&rest[..pos], sign * value)
        } else {
            (rest, 0)
        };

        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
        let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

        Ok(DiceExpression {
            count,
            die_type,
            modifier,
        })
    }

    /// The dice part without the modifier, e.g. `2d6`.
    pub fn dice_notation(&self) -> String {
        format!("{}{}", self.count, self.die_type)
    }

    /// Lowest possible total (all dice roll 1).
    pub fn min_total(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// Highest possible total (all dice roll their maximum).
    pub fn max_total(&self) -> i32 {
        (self.count * self.die_type.sides()) as i32 + self.modifier
    }

    /// Roll with a specific RNG (useful for testing).
    pub fn roll_with_rng<R: Rng>(&self, name: impl Into<String>, rng: &mut R) -> DiceRoll {
        let raw: u32 = (0..self.count)
            .map(|_| rng.gen_range(1..=self.die_type.sides()))
            .sum();
        DiceRoll {
            name: name.into(),
            dice_type: self.dice_notation(),
            result: raw as i32,
            modifier: self.modifier,
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dice_notation())?;
        if self.modifier > 0 {
            write!(f, "+{}", self.modifier)?;
        } else if self.modifier < 0 {
            write!(f, "{}", self.modifier)?;
        }
        Ok(())
    }
}

/// One recorded dice roll, attached to an execution result.
///
/// The total is always derived from `result + modifier`, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// What the roll was for, e.g. "attack damage".
    pub name: String,
    /// Dice part of the notation, e.g. `1d6`.
    pub dice_type: String,
    /// Raw sum of the dice, before the modifier.
    pub result: i32,
    pub modifier: i32,
}

impl DiceRoll {
    pub fn total(&self) -> i32 {
        self.result + self.modifier
    }

    /// Check if the roll meets or exceeds a DC.
    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total() >= dc
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier != 0 {
            write!(
                f,
                "{}: {} ({}{:+}) = {}",
                self.name,
                self.dice_type,
                self.result,
                self.modifier,
                self.total()
            )
        } else {
            write!(f, "{}: {} = {}", self.name, self.dice_type, self.total())
        }
    }
}

/// Source of dice results during action execution.
///
/// Production uses [`RandomRoller`]; tests script exact outcomes with
/// [`crate::testing::FixedRoller`].
pub trait DiceRoller {
    fn roll(&mut self, name: &str, expr: &DiceExpression) -> DiceRoll;
}

/// Roller backed by a real RNG.
pub struct RandomRoller<R: Rng> {
    rng: R,
}

impl RandomRoller<StdRng> {
    pub fn new() -> Self {
        RandomRoller {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded roller for reproducible sequences.
    pub fn seeded(seed: u64) -> Self {
        RandomRoller {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRoller<StdRng> {
    fn default() -> Self {
        RandomRoller::new()
    }
}

impl<R: Rng> RandomRoller<R> {
    pub fn with_rng(rng: R) -> Self {
        RandomRoller { rng }
    }
}

impl<R: Rng> DiceRoller for RandomRoller<R> {
    fn roll(&mut self, name: &str, expr: &DiceExpression) -> DiceRoll {
        expr.roll_with_rng(name, &mut self.rng)
    }
}

/// Convenience function to parse and roll in one step with a fresh RNG.
pub fn roll(name: &str, notation: &str) -> Result<DiceRoll, DiceError> {
    let expr = DiceExpression::parse(notation)?;
    Ok(expr.roll_with_rng(name, &mut rand::thread_rng()))
}
