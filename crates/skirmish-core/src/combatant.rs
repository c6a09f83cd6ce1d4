//! Combatant types.
//!
//! This module provides the participants of a combat:
//! - [`CombatantId`]: Stable index of a combatant within its combat
//! - [`CombatantKind`]: Hero or monster
//! - [`Abilities`]: Capability tags gating which actions are legal
//! - [`Stats`]: Vital statistics copied from the external record
//! - [`Combatant`]: The complete participant
//!
//! # Storage
//!
//! Combatants live in a flat vector owned by [`Combat`](crate::state::Combat)
//! and are addressed by [`CombatantId`]. Turn snapshots copy the fields they
//! need by value, so the log never aliases live state.
//!
//! # Example
//!
//! ```
//! use skirmish_core::combatant::{Abilities, Combatant, CombatantId, CombatantKind, Stats};
//!
//! let goblin = Combatant::new(
//!     CombatantId::new(1),
//!     "monster-0-Goblin",
//!     "Goblin",
//!     CombatantKind::Monster,
//!     Stats::new(30, 8, 2, 12),
//!     Abilities::ATTACK,
//! );
//!
//! assert!(goblin.is_alive());
//! assert_eq!(goblin.health(), 30);
//! ```

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::status::{AppliedStatusEffect, StatusEffectKind};

// =============================================================================
// Identity
// =============================================================================

/// Stable identifier of a combatant within one combat.
///
/// Ids are assigned in roster order (heroes first, then monsters) and double
/// as the index into the combat's combatant storage.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the storage index of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombatantId({})", self.0)
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CombatantId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Whether a combatant is a hero or a monster.
///
/// The kind selects the AI policy and is independent of which team the
/// combatant fights on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    /// Player-side adventurer.
    Hero,
    /// Hostile creature.
    Monster,
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hero => write!(f, "Hero"),
            Self::Monster => write!(f, "Monster"),
        }
    }
}

bitflags! {
    /// Capability tags gating which action strategies a combatant may use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Abilities: u8 {
        /// Basic weapon attack.
        const ATTACK = 1 << 0;
        /// Defensive stance.
        const DEFEND = 1 << 1;
        /// Poisonous secretions.
        const POISON = 1 << 2;
    }
}

impl Abilities {
    /// Abilities granted to every hero.
    pub const HERO_DEFAULT: Self = Self::ATTACK.union(Self::DEFEND);

    /// Abilities beyond the basic attack and defend, in declaration order.
    pub fn specials(self) -> impl Iterator<Item = Self> {
        self.difference(Self::ATTACK | Self::DEFEND).iter()
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Vital statistics of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Current health, never above `max_health`.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Offensive power.
    pub attack: u32,
    /// Damage mitigation.
    pub defense: u32,
    /// Initiative; higher acts more often.
    pub speed: u32,
}

impl Stats {
    /// Creates stats at full health.
    #[must_use]
    pub const fn new(max_health: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            health: max_health,
            max_health,
            attack,
            defense,
            speed,
        }
    }

    /// Returns a copy with the given current health, clamped to max health.
    #[must_use]
    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health.min(self.max_health);
        self
    }
}

// =============================================================================
// Combatant
// =============================================================================

/// A participant in one combat.
///
/// Health and the flee flag are mutated only through the state manager and
/// status effects only through the status engine; everything else is fixed
/// at creation.
///
/// # Invariants
///
/// - `0 <= health <= max_health`
/// - `alive == (health > 0 && !has_fled)` after every state update
/// - `has_fled` is sticky
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    id: CombatantId,
    key: String,
    name: String,
    kind: CombatantKind,
    stats: Stats,
    abilities: Abilities,
    status_effects: Vec<AppliedStatusEffect>,
    alive: bool,
    has_fled: bool,
    experience_reward: u32,
}

impl Combatant {
    /// Creates a combatant with no status effects.
    #[must_use]
    pub fn new(
        id: CombatantId,
        key: impl Into<String>,
        name: impl Into<String>,
        kind: CombatantKind,
        stats: Stats,
        abilities: Abilities,
    ) -> Self {
        let stats = stats.with_health(stats.health);
        Self {
            id,
            key: key.into(),
            name: name.into(),
            kind,
            stats,
            abilities,
            status_effects: Vec::new(),
            alive: stats.health > 0,
            has_fled: false,
            experience_reward: 0,
        }
    }

    /// Sets the experience awarded for defeating this combatant.
    #[must_use]
    pub fn with_experience_reward(mut self, reward: u32) -> Self {
        self.experience_reward = reward;
        self
    }

    /// Stable id within the combat.
    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    /// Unique string key, `"<side>-<index>-<name>"`.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hero or monster.
    #[must_use]
    pub const fn kind(&self) -> CombatantKind {
        self.kind
    }

    /// Returns true for heroes.
    #[must_use]
    pub fn is_hero(&self) -> bool {
        self.kind == CombatantKind::Hero
    }

    /// Vital statistics.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.stats.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.stats.max_health
    }

    /// Attack stat.
    #[must_use]
    pub const fn attack(&self) -> u32 {
        self.stats.attack
    }

    /// Defense stat.
    #[must_use]
    pub const fn defense(&self) -> u32 {
        self.stats.defense
    }

    /// Speed stat.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.stats.speed
    }

    /// Current health as a fraction of max health, in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.stats.max_health == 0 {
            return 0.0;
        }
        f64::from(self.stats.health) / f64::from(self.stats.max_health)
    }

    /// Current health as a percentage of max health, in `[0, 100]`.
    #[must_use]
    pub fn health_percent(&self) -> f64 {
        self.health_fraction() * 100.0
    }

    /// Capability tags.
    #[must_use]
    pub const fn abilities(&self) -> Abilities {
        self.abilities
    }

    /// Returns true if the combatant has every tag in `ability`.
    #[must_use]
    pub fn has_ability(&self, ability: Abilities) -> bool {
        self.abilities.contains(ability)
    }

    /// Active status effects, in application order.
    #[must_use]
    pub fn status_effects(&self) -> &[AppliedStatusEffect] {
        &self.status_effects
    }

    /// Returns the active effect of the given kind, if any.
    #[must_use]
    pub fn status_effect(&self, kind: StatusEffectKind) -> Option<&AppliedStatusEffect> {
        self.status_effects.iter().find(|e| e.kind() == kind)
    }

    /// Returns true while the combatant can still take part in the fight.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Returns true once the combatant has escaped.
    #[must_use]
    pub const fn has_fled(&self) -> bool {
        self.has_fled
    }

    /// Returns true if the combatant was killed rather than escaping.
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.stats.health == 0 && !self.has_fled
    }

    /// Experience carried by the source record.
    #[must_use]
    pub const fn experience_reward(&self) -> u32 {
        self.experience_reward
    }

    pub(crate) fn set_id(&mut self, id: CombatantId) {
        self.id = id;
    }

    pub(crate) fn status_effects_mut(&mut self) -> &mut Vec<AppliedStatusEffect> {
        &mut self.status_effects
    }

    pub(crate) fn set_health(&mut self, health: u32) {
        self.stats.health = health.min(self.stats.max_health);
        self.refresh_alive();
    }

    pub(crate) fn mark_fled(&mut self) {
        self.has_fled = true;
        self.alive = false;
    }

    pub(crate) fn refresh_alive(&mut self) {
        self.alive = self.stats.health > 0 && !self.has_fled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goblin() -> Combatant {
        Combatant::new(
            CombatantId::new(3),
            "monster-0-Goblin",
            "Goblin",
            CombatantKind::Monster,
            Stats::new(40, 8, 4, 10),
            Abilities::ATTACK | Abilities::POISON,
        )
    }

    mod id_tests {
        use super::*;

        #[test]
        fn id_round_trips() {
            let id = CombatantId::new(7);
            assert_eq!(id.as_u32(), 7);
            assert_eq!(id.index(), 7);
            assert_eq!(format!("{id:?}"), "CombatantId(7)");
            assert_eq!(id.to_string(), "7");
        }

        #[test]
        fn ids_are_ordered() {
            assert!(CombatantId::new(1) < CombatantId::new(2));
        }
    }

    mod ability_tests {
        use super::*;

        #[test]
        fn hero_default_has_attack_and_defend() {
            assert!(Abilities::HERO_DEFAULT.contains(Abilities::ATTACK));
            assert!(Abilities::HERO_DEFAULT.contains(Abilities::DEFEND));
            assert!(!Abilities::HERO_DEFAULT.contains(Abilities::POISON));
        }

        #[test]
        fn specials_skip_attack_and_defend() {
            let all = Abilities::all();
            let specials: Vec<_> = all.specials().collect();
            assert_eq!(specials, vec![Abilities::POISON]);
            assert_eq!(Abilities::HERO_DEFAULT.specials().count(), 0);
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn new_combatant_is_alive_at_full_health() {
            let g = goblin();
            assert!(g.is_alive());
            assert!(!g.has_fled());
            assert!((g.health_fraction() - 1.0).abs() < f64::EPSILON);
            assert!(g.status_effects().is_empty());
        }

        #[test]
        fn health_is_clamped_on_creation() {
            let stats = Stats {
                health: 500,
                ..Stats::new(50, 1, 1, 1)
            };
            let c = Combatant::new(
                CombatantId::new(0),
                "hero-0-A",
                "A",
                CombatantKind::Hero,
                stats,
                Abilities::HERO_DEFAULT,
            );
            assert_eq!(c.health(), 50);
        }

        #[test]
        fn set_health_clamps_and_updates_alive() {
            let mut g = goblin();
            g.set_health(1_000);
            assert_eq!(g.health(), 40);
            g.set_health(0);
            assert!(!g.is_alive());
            assert!(g.is_defeated());
        }

        #[test]
        fn fled_is_sticky_and_not_defeated() {
            let mut g = goblin();
            g.mark_fled();
            g.set_health(20);
            assert!(g.has_fled());
            assert!(!g.is_alive());
            assert!(!g.is_defeated());
        }

        #[test]
        fn serializes_to_json() {
            let g = goblin().with_experience_reward(12);
            let json = serde_json::to_string(&g).unwrap();
            let back: Combatant = serde_json::from_str(&json).unwrap();
            assert_eq!(back, g);
        }
    }
}
