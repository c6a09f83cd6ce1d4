//! Test helper functions for building records and combats.

use crate::combatant::Abilities;
use crate::config::InitiativeConfig;
use crate::entity::{EntityConverter, HeroRecord, MonsterRecord};
use crate::state::Combat;

// =============================================================================
// Records
// =============================================================================

/// A hero at full health.
pub fn hero(name: &str, health: u32, attack: u32, defense: u32, speed: u32) -> HeroRecord {
    HeroRecord::new(name, health, attack, defense, speed)
}

/// A monster that can only attack. Its experience reward equals its max health.
pub fn monster(name: &str, health: u32, attack: u32, defense: u32, speed: u32) -> MonsterRecord {
    MonsterRecord::new(name, health, attack, defense, speed).with_experience_reward(health)
}

/// A monster that can attack and poison.
pub fn poisonous_monster(
    name: &str,
    health: u32,
    attack: u32,
    defense: u32,
    speed: u32,
) -> MonsterRecord {
    monster(name, health, attack, defense, speed)
        .with_abilities(Abilities::ATTACK | Abilities::POISON)
}

// =============================================================================
// Combat Setup
// =============================================================================

/// Builds a fresh combat from records with default initiative.
///
/// # Panics
///
/// Panics if a record is invalid.
pub fn two_sided_combat(heroes: Vec<HeroRecord>, monsters: Vec<MonsterRecord>) -> Combat {
    Combat::new(
        EntityConverter::convert_heroes(&heroes).expect("valid hero records"),
        EntityConverter::convert_monsters(&monsters).expect("valid monster records"),
        InitiativeConfig::default(),
    )
}
