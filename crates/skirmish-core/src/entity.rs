//! External records and their conversion into combatants.
//!
//! The game owns [`HeroRecord`]s and [`MonsterRecord`]s; the engine only
//! borrows them. [`EntityConverter`] validates each record and builds a
//! [`Combatant`] with a unique key of the form `"<side>-<index>-<name>"`.
//!
//! # Example
//!
//! ```
//! use skirmish_core::entity::{EntityConverter, HeroRecord};
//!
//! let heroes = vec![HeroRecord::new("Aria", 100, 20, 10, 15)];
//! let combatants = EntityConverter::convert_heroes(&heroes).unwrap();
//! assert_eq!(combatants[0].key(), "hero-0-Aria");
//! ```

use serde::{Deserialize, Serialize};

use crate::combatant::{Abilities, Combatant, CombatantId, CombatantKind, Stats};
use crate::error::CombatError;

fn default_monster_abilities() -> Abilities {
    Abilities::ATTACK
}

/// A hero as the game stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroRecord {
    /// Display name.
    pub name: String,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Attack stat.
    pub attack: u32,
    /// Defense stat.
    pub defense: u32,
    /// Speed stat.
    pub speed: u32,
}

impl HeroRecord {
    /// Creates a hero at full health.
    #[must_use]
    pub fn new(name: impl Into<String>, max_health: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            name: name.into(),
            health: max_health,
            max_health,
            attack,
            defense,
            speed,
        }
    }
}

/// A monster as the game's bestiary describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterRecord {
    /// Display name.
    pub name: String,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Attack stat.
    pub attack: u32,
    /// Defense stat.
    pub defense: u32,
    /// Speed stat.
    pub speed: u32,
    /// Capability tags.
    #[serde(default = "default_monster_abilities")]
    pub abilities: Abilities,
    /// Experience awarded for the kill.
    #[serde(default)]
    pub experience_reward: u32,
}

impl MonsterRecord {
    /// Creates a monster at full health that can only attack.
    #[must_use]
    pub fn new(name: impl Into<String>, max_health: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            name: name.into(),
            health: max_health,
            max_health,
            attack,
            defense,
            speed,
            abilities: default_monster_abilities(),
            experience_reward: 0,
        }
    }

    /// Replaces the ability set.
    #[must_use]
    pub fn with_abilities(mut self, abilities: Abilities) -> Self {
        self.abilities = abilities;
        self
    }

    /// Sets the experience reward.
    #[must_use]
    pub fn with_experience_reward(mut self, reward: u32) -> Self {
        self.experience_reward = reward;
        self
    }
}

/// Turns records into combatants.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityConverter;

impl EntityConverter {
    /// Converts heroes in roster order. Heroes can attack and defend.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::InvalidCombatant`] for impossible stats.
    pub fn convert_heroes(records: &[HeroRecord]) -> Result<Vec<Combatant>, CombatError> {
        records
            .iter()
            .enumerate()
            .map(|(index, r)| {
                let stats = vitals(&r.name, r.health, r.max_health, r.attack, r.defense, r.speed)?;
                Ok(Combatant::new(
                    provisional_id(index),
                    format!("hero-{index}-{}", r.name),
                    r.name.clone(),
                    CombatantKind::Hero,
                    stats,
                    Abilities::HERO_DEFAULT,
                ))
            })
            .collect()
    }

    /// Converts monsters in roster order.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::InvalidCombatant`] for impossible stats.
    pub fn convert_monsters(records: &[MonsterRecord]) -> Result<Vec<Combatant>, CombatError> {
        records
            .iter()
            .enumerate()
            .map(|(index, r)| {
                let stats = vitals(&r.name, r.health, r.max_health, r.attack, r.defense, r.speed)?;
                Ok(Combatant::new(
                    provisional_id(index),
                    format!("monster-{index}-{}", r.name),
                    r.name.clone(),
                    CombatantKind::Monster,
                    stats,
                    r.abilities,
                )
                .with_experience_reward(r.experience_reward))
            })
            .collect()
    }
}

// The combat reassigns ids when it takes ownership.
fn provisional_id(index: usize) -> CombatantId {
    CombatantId::new(u32::try_from(index).unwrap_or(u32::MAX))
}

fn vitals(
    name: &str,
    health: u32,
    max_health: u32,
    attack: u32,
    defense: u32,
    speed: u32,
) -> Result<Stats, CombatError> {
    let invalid = |reason| CombatError::InvalidCombatant {
        name: name.to_string(),
        reason,
    };
    if max_health == 0 {
        return Err(invalid("max health must be positive"));
    }
    if health == 0 {
        return Err(invalid("cannot enter combat with zero health"));
    }
    if health > max_health {
        return Err(invalid("health exceeds max health"));
    }
    Ok(Stats::new(max_health, attack, defense, speed).with_health(health))
}
