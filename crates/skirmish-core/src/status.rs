//! Timed status effects.
//!
//! A [`StatusEffect`] is an immutable template; an [`AppliedStatusEffect`] is
//! that template bound to a combatant with an application and expiry time on
//! the combat clock. The [`StatusEffectEngine`] is the only code that mutates
//! a combatant's effect list.
//!
//! # Global tick grid
//!
//! Damage and healing over time never fire at the moment an effect is
//! applied. They land on a fixed grid (every `tick_interval` clock units from
//! combat start), and only for effects applied strictly before the grid
//! point. Stacking an effect keeps its original `applied_at`, so re-applying
//! poison raises the damage per tick and extends the end time without pushing
//! the next tick back.
//!
//! At a grid point, expiry is evaluated before damage: an effect whose
//! `expires_at` is at or before the grid point wears off instead of ticking.
//!
//! # Example
//!
//! ```
//! use skirmish_core::combatant::{Abilities, Combatant, CombatantId, CombatantKind, Stats};
//! use skirmish_core::config::StatusEffectConfig;
//! use skirmish_core::status::{StatusEffect, StatusEffectEngine, StatusEffectKind};
//!
//! let engine = StatusEffectEngine::new(StatusEffectConfig::default());
//! let mut hero = Combatant::new(
//!     CombatantId::new(0), "hero-0-Aria", "Aria", CombatantKind::Hero,
//!     Stats::new(100, 20, 10, 15), Abilities::HERO_DEFAULT,
//! );
//!
//! engine.apply_status_effect(&mut hero, StatusEffect::poisoned(300, 5), 0);
//! engine.apply_status_effect(&mut hero, StatusEffect::poisoned(300, 7), 50);
//!
//! let poison = hero.status_effect(StatusEffectKind::Poisoned).unwrap();
//! assert_eq!(poison.damage_over_time(), 12);
//! assert_eq!(poison.applied_at(), 0);
//! assert_eq!(poison.expires_at(), 350);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::combatant::{Combatant, CombatantId};
use crate::config::StatusEffectConfig;
use crate::state::Combat;

// =============================================================================
// Templates
// =============================================================================

/// The kinds of status effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectKind {
    /// Defensive stance reducing incoming damage.
    Defending,
    /// Damage over time.
    Poisoned,
    /// Healing over time.
    Regenerating,
    /// Cannot act.
    Stunned,
    /// Increased outgoing damage.
    Empowered,
}

impl fmt::Display for StatusEffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defending => write!(f, "Defending"),
            Self::Poisoned => write!(f, "Poisoned"),
            Self::Regenerating => write!(f, "Regenerating"),
            Self::Stunned => write!(f, "Stunned"),
            Self::Empowered => write!(f, "Empowered"),
        }
    }
}

/// Immutable definition of a status effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect kind; at most one effect per kind is active on a combatant.
    pub kind: StatusEffectKind,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Lifetime in clock units.
    pub duration: u64,
    /// Whether re-application merges into the active effect.
    pub stackable: bool,
    /// Fraction of incoming damage removed.
    pub damage_reduction: f64,
    /// Fraction of outgoing damage added.
    pub damage_increase: f64,
    /// Damage dealt on each grid tick.
    pub damage_over_time: u32,
    /// Healing restored on each grid tick.
    pub healing_over_time: u32,
}

impl StatusEffect {
    fn base(kind: StatusEffectKind, description: &str, duration: u64, stackable: bool) -> Self {
        Self {
            kind,
            name: kind.to_string(),
            description: description.to_string(),
            duration,
            stackable,
            damage_reduction: 0.0,
            damage_increase: 0.0,
            damage_over_time: 0,
            healing_over_time: 0,
        }
    }

    /// Defensive stance. Re-applying refreshes rather than stacks.
    #[must_use]
    pub fn defending(duration: u64, reduction: f64) -> Self {
        Self {
            damage_reduction: reduction,
            ..Self::base(
                StatusEffectKind::Defending,
                "Braced for impact, taking reduced damage",
                duration,
                false,
            )
        }
    }

    /// Stackable damage over time.
    #[must_use]
    pub fn poisoned(duration: u64, damage_per_tick: u32) -> Self {
        Self {
            damage_over_time: damage_per_tick,
            ..Self::base(
                StatusEffectKind::Poisoned,
                "Toxins burn through the veins",
                duration,
                true,
            )
        }
    }

    /// Stackable healing over time.
    #[must_use]
    pub fn regenerating(duration: u64, healing_per_tick: u32) -> Self {
        Self {
            healing_over_time: healing_per_tick,
            ..Self::base(
                StatusEffectKind::Regenerating,
                "Wounds knit together",
                duration,
                true,
            )
        }
    }

    /// Prevents the combatant from acting.
    #[must_use]
    pub fn stunned(duration: u64) -> Self {
        Self::base(StatusEffectKind::Stunned, "Reeling and unable to act", duration, false)
    }

    /// Stackable outgoing damage bonus.
    #[must_use]
    pub fn empowered(duration: u64, increase: f64) -> Self {
        Self {
            damage_increase: increase,
            ..Self::base(
                StatusEffectKind::Empowered,
                "Surging with strength",
                duration,
                true,
            )
        }
    }
}

/// A status effect bound to a combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStatusEffect {
    effect: StatusEffect,
    applied_at: u64,
    expires_at: u64,
}

impl AppliedStatusEffect {
    /// Binds `effect` to the clock at `now`.
    #[must_use]
    pub fn new(effect: StatusEffect, now: u64) -> Self {
        let expires_at = now.saturating_add(effect.duration);
        Self {
            effect,
            applied_at: now,
            expires_at,
        }
    }

    /// The accumulated effect values.
    #[must_use]
    pub fn effect(&self) -> &StatusEffect {
        &self.effect
    }

    /// Effect kind.
    #[must_use]
    pub fn kind(&self) -> StatusEffectKind {
        self.effect.kind
    }

    /// Clock time of the first application. Never changes after creation.
    #[must_use]
    pub const fn applied_at(&self) -> u64 {
        self.applied_at
    }

    /// Clock time at which the effect ends.
    #[must_use]
    pub const fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Accumulated damage per tick.
    #[must_use]
    pub fn damage_over_time(&self) -> u32 {
        self.effect.damage_over_time
    }

    /// Accumulated healing per tick.
    #[must_use]
    pub fn healing_over_time(&self) -> u32 {
        self.effect.healing_over_time
    }

    /// Accumulated damage reduction.
    #[must_use]
    pub fn damage_reduction(&self) -> f64 {
        self.effect.damage_reduction
    }

    /// Accumulated damage increase.
    #[must_use]
    pub fn damage_increase(&self) -> f64 {
        self.effect.damage_increase
    }

    /// Returns true once the clock has reached `expires_at`.
    #[must_use]
    pub const fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Clock units left before expiry.
    #[must_use]
    pub const fn remaining(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// What [`StatusEffectEngine::apply_status_effect`] did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Application {
    /// No effect of that kind was active; a fresh one was added.
    Added,
    /// A non-stackable effect of that kind was replaced.
    Replaced,
    /// The effect merged into the active one.
    Stacked,
}

/// Per-combatant result of one grid tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickChange {
    /// Affected combatant.
    pub combatant: CombatantId,
    /// Damage actually applied.
    pub damage: u32,
    /// Healing actually applied.
    pub healing: u32,
    /// Effects that wore off at this tick.
    pub expired: Vec<StatusEffectKind>,
}

/// Result of [`StatusEffectEngine::process_time_based_status_effects`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Whether anything worth a log entry happened.
    pub should_create_turn: bool,
    /// Human-readable messages, in combatant order.
    pub messages: Vec<String>,
    /// Per-combatant changes, only for combatants something happened to.
    pub changes: Vec<TickChange>,
}

/// Applies, stacks, expires and queries status effects.
#[derive(Debug, Clone, Default)]
pub struct StatusEffectEngine {
    config: StatusEffectConfig,
}

impl StatusEffectEngine {
    /// Creates an engine with the given caps.
    #[must_use]
    pub fn new(config: StatusEffectConfig) -> Self {
        Self { config }
    }

    /// Applies `effect` to `combatant` at clock time `now`.
    ///
    /// If an effect of the same kind is active and `effect` is stackable, the
    /// two merge: `applied_at` is kept, `expires_at` becomes the later of the
    /// two expirations, and the magnitudes are summed (reduction capped).
    /// Otherwise any effect of that kind is removed and a fresh one is added.
    pub fn apply_status_effect(
        &self,
        combatant: &mut Combatant,
        effect: StatusEffect,
        now: u64,
    ) -> Application {
        let effects = combatant.status_effects_mut();
        let existing = effects.iter().position(|e| e.kind() == effect.kind);

        match existing {
            Some(idx) if effect.stackable => {
                let current = &mut effects[idx];
                current.expires_at = current
                    .expires_at
                    .max(now.saturating_add(effect.duration));
                let merged = &mut current.effect;
                merged.damage_over_time = merged
                    .damage_over_time
                    .saturating_add(effect.damage_over_time);
                merged.healing_over_time = merged
                    .healing_over_time
                    .saturating_add(effect.healing_over_time);
                merged.damage_increase += effect.damage_increase;
                merged.damage_reduction = (merged.damage_reduction + effect.damage_reduction)
                    .min(self.config.max_stacked_reduction);
                trace!(kind = %effect.kind, expires_at = current.expires_at, "stacked status effect");
                Application::Stacked
            }
            Some(idx) => {
                effects.remove(idx);
                effects.push(AppliedStatusEffect::new(effect, now));
                Application::Replaced
            }
            None => {
                effects.push(AppliedStatusEffect::new(effect, now));
                Application::Added
            }
        }
    }

    /// Removes effects whose expiry time has been reached and returns them.
    ///
    /// Never deals damage or healing.
    pub fn process_status_effects(
        &self,
        combatant: &mut Combatant,
        now: u64,
    ) -> Vec<AppliedStatusEffect> {
        let effects = combatant.status_effects_mut();
        let mut expired = Vec::new();
        let mut idx = 0;
        while idx < effects.len() {
            if effects[idx].is_expired(now) {
                expired.push(effects.remove(idx));
            } else {
                idx += 1;
            }
        }
        expired
    }

    /// Evaluates damage and healing over time at grid point `interval_time`.
    ///
    /// For every living combatant: effects with `expires_at <= interval_time`
    /// are removed first and reported as worn off; then the damage and
    /// healing of every remaining effect applied strictly before
    /// `interval_time` are netted into one amount and applied once. Poison 5
    /// with regeneration 3 is a single 2-point hit.
    pub fn process_time_based_status_effects(
        &self,
        combat: &mut Combat,
        interval_time: u64,
    ) -> TickReport {
        let mut report = TickReport::default();
        let ids: Vec<CombatantId> = combat
            .combatants()
            .iter()
            .filter(|c| c.is_alive())
            .map(Combatant::id)
            .collect();

        for id in ids {
            let combatant = combat.combatant_mut(id);
            let name = combatant.name().to_string();

            let expired = self.process_status_effects(combatant, interval_time);
            let (mut dot, mut hot) = (0u32, 0u32);
            for effect in combatant.status_effects() {
                if effect.applied_at() < interval_time {
                    dot = dot.saturating_add(effect.damage_over_time());
                    hot = hot.saturating_add(effect.healing_over_time());
                }
            }

            let mut change = TickChange {
                combatant: id,
                damage: 0,
                healing: 0,
                expired: expired.iter().map(AppliedStatusEffect::kind).collect(),
            };

            for effect in &expired {
                report
                    .messages
                    .push(format!("{name}'s {} has worn off.", effect.effect().name));
            }

            let (damage, healing) = (dot.saturating_sub(hot), hot.saturating_sub(dot));

            if damage > 0 {
                change.damage = combat.apply_damage(id, damage);
                report
                    .messages
                    .push(format!("{name} takes {} poison damage!", change.damage));
                if !combat.combatant(id).is_alive() {
                    report.messages.push(format!("{name} succumbs to the poison!"));
                }
            }

            if healing > 0 {
                change.healing = combat.apply_healing(id, healing);
                if change.healing > 0 {
                    report
                        .messages
                        .push(format!("{name} regenerates {} health!", change.healing));
                }
            }

            if change.damage > 0 || change.healing > 0 || !change.expired.is_empty() {
                report.changes.push(change);
            }
        }

        report.should_create_turn = !report.messages.is_empty();
        report
    }

    /// Total damage reduction across active effects, capped.
    #[must_use]
    pub fn calculate_damage_reduction(&self, combatant: &Combatant) -> f64 {
        combatant
            .status_effects()
            .iter()
            .map(AppliedStatusEffect::damage_reduction)
            .sum::<f64>()
            .min(self.config.max_total_reduction)
    }

    /// Total damage increase across active effects.
    #[must_use]
    pub fn calculate_damage_increase(&self, combatant: &Combatant) -> f64 {
        combatant
            .status_effects()
            .iter()
            .map(AppliedStatusEffect::damage_increase)
            .sum()
    }

    /// Returns false while the combatant is stunned.
    #[must_use]
    pub fn can_act(&self, combatant: &Combatant) -> bool {
        !self.has_status_effect(combatant, StatusEffectKind::Stunned)
    }

    /// Returns true if an effect of `kind` is active.
    #[must_use]
    pub fn has_status_effect(&self, combatant: &Combatant, kind: StatusEffectKind) -> bool {
        combatant.status_effect(kind).is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
