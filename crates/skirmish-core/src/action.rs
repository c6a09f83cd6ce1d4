//! Action strategies.
//!
//! An [`ActionKind`] is what the AI asks for; an [`ActionStrategy`] is the
//! concrete behaviour that resolves it. The set is closed and small, so the
//! strategies form a plain enum and [`ActionStrategy::resolve`] is a pure
//! mapping from kind (and, for specials, ability tag) to variant.
//!
//! Strategies only compute an [`ActionOutcome`]; committing it to combat
//! state is the executor's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::{Abilities, Combatant};
use crate::config::{AttackConfig, CombatConfig, FleeConfig, StatusEffectConfig};
use crate::random::RandomSource;
use crate::status::{StatusEffect, StatusEffectEngine, StatusEffectKind};

// =============================================================================
// Kinds
// =============================================================================

/// The action an AI requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Basic weapon attack.
    Attack,
    /// Defensive stance.
    Defend,
    /// Attempt to leave the fight.
    Flee,
    /// The actor's first special ability.
    Special,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack => write!(f, "Attack"),
            Self::Defend => write!(f, "Defend"),
            Self::Flee => write!(f, "Flee"),
            Self::Special => write!(f, "Special"),
        }
    }
}

/// What a strategy produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Damage to the target.
    pub damage: Option<u32>,
    /// Healing to the actor.
    pub healing: Option<u32>,
    /// Effects to apply; Defend targets the actor, everything else the target.
    pub status_effects: Vec<StatusEffect>,
    /// Whether the action worked.
    pub success: bool,
    /// Whether an attack was a critical hit.
    pub critical: bool,
    /// Narrative line for the log.
    pub description: String,
}

impl ActionOutcome {
    fn failed(description: String) -> Self {
        Self {
            success: false,
            description,
            ..Self::default()
        }
    }
}

/// Balance parameters shared by all strategies.
#[derive(Debug, Clone, Default)]
pub struct ActionRules {
    /// Attack formula.
    pub attack: AttackConfig,
    /// Flee formula.
    pub flee: FleeConfig,
    /// Effect durations and magnitudes.
    pub effects: StatusEffectConfig,
    /// Engine used for damage modifiers.
    pub engine: StatusEffectEngine,
}

impl ActionRules {
    /// Extracts the action rules from a combat configuration.
    #[must_use]
    pub fn from_config(config: &CombatConfig) -> Self {
        Self {
            attack: config.attack,
            flee: config.flee,
            effects: config.effects,
            engine: StatusEffectEngine::new(config.effects),
        }
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// Concrete action behaviour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionStrategy {
    /// Weapon attack with variance and critical hits.
    Attack,
    /// Defensive stance on the actor.
    Defend,
    /// Escape attempt.
    Flee,
    /// Stackable poison on the target.
    Poison,
}

impl fmt::Display for ActionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack => write!(f, "Attack"),
            Self::Defend => write!(f, "Defend"),
            Self::Flee => write!(f, "Flee"),
            Self::Poison => write!(f, "Poison"),
        }
    }
}

impl ActionStrategy {
    /// Maps a requested kind to the strategy the actor will use.
    ///
    /// `Special` resolves to the actor's first ability other than attack and
    /// defend, or to `Attack` if there is none.
    #[must_use]
    pub fn resolve(kind: ActionKind, actor: &Combatant) -> Self {
        match kind {
            ActionKind::Attack => Self::Attack,
            ActionKind::Defend => Self::Defend,
            ActionKind::Flee => Self::Flee,
            ActionKind::Special => actor
                .abilities()
                .specials()
                .next()
                .map_or(Self::Attack, Self::for_ability),
        }
    }

    /// Strategy behind a single special ability tag.
    ///
    /// # Panics
    ///
    /// Panics if `ability` has no strategy mapping; that is a programming
    /// error, not a runtime condition.
    #[must_use]
    pub fn for_ability(ability: Abilities) -> Self {
        if ability == Abilities::POISON {
            Self::Poison
        } else {
            panic!("no action strategy for ability {ability:?}")
        }
    }

    /// The kind this strategy answers to.
    #[must_use]
    pub const fn action_kind(self) -> ActionKind {
        match self {
            Self::Attack => ActionKind::Attack,
            Self::Defend => ActionKind::Defend,
            Self::Flee => ActionKind::Flee,
            Self::Poison => ActionKind::Special,
        }
    }

    /// Returns true if `actor` may use this strategy on `target` right now.
    #[must_use]
    pub fn can_execute(self, actor: &Combatant, target: &Combatant) -> bool {
        if !actor.is_alive() {
            return false;
        }
        match self {
            Self::Attack => target.is_alive(),
            Self::Defend => actor.has_ability(Abilities::DEFEND),
            Self::Flee => true,
            Self::Poison => actor.has_ability(Abilities::POISON) && target.is_alive(),
        }
    }

    /// Computes the outcome of `actor` using this strategy on `target`.
    ///
    /// Does not mutate anything. Returns an unsuccessful outcome when
    /// [`can_execute`](Self::can_execute) is false.
    pub fn execute(
        self,
        rules: &ActionRules,
        actor: &Combatant,
        target: &Combatant,
        rng: &mut dyn RandomSource,
    ) -> ActionOutcome {
        if !self.can_execute(actor, target) {
            return ActionOutcome::failed(format!(
                "{} cannot {} right now.",
                actor.name(),
                self.to_string().to_lowercase()
            ));
        }
        match self {
            Self::Attack => attack(rules, actor, target, rng),
            Self::Defend => defend(rules, actor),
            Self::Flee => flee(rules, actor, target, rng),
            Self::Poison => poison(rules, actor, target),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn attack(
    rules: &ActionRules,
    actor: &Combatant,
    target: &Combatant,
    rng: &mut dyn RandomSource,
) -> ActionOutcome {
    let cfg = &rules.attack;
    let base = (f64::from(actor.attack()) - cfg.defense_factor * f64::from(target.defense()))
        .max(1.0);
    let variance = rng.range(cfg.variance_min, cfg.variance_max);
    let critical = rng.chance(cfg.crit_chance);
    let multiplier = if critical { cfg.crit_multiplier } else { 1.0 };

    let raw = base
        * variance
        * multiplier
        * (1.0 + rules.engine.calculate_damage_increase(actor))
        * (1.0 - rules.engine.calculate_damage_reduction(target));
    // Absorb float noise from the variance interpolation before flooring.
    let damage = ((raw + 1e-9).floor() as u32).max(1);

    let description = if critical {
        format!(
            "{} lands a critical hit on {} for {damage} damage!",
            actor.name(),
            target.name()
        )
    } else {
        format!("{} attacks {} for {damage} damage!", actor.name(), target.name())
    };

    ActionOutcome {
        damage: Some(damage),
        success: true,
        critical,
        description,
        ..ActionOutcome::default()
    }
}

fn defend(rules: &ActionRules, actor: &Combatant) -> ActionOutcome {
    let effect = StatusEffect::defending(rules.effects.defend_duration, rules.effects.defend_reduction);
    ActionOutcome {
        status_effects: vec![effect],
        success: true,
        description: format!("{} takes a defensive stance!", actor.name()),
        ..ActionOutcome::default()
    }
}

/// Probability that `actor` escapes from `target`.
#[must_use]
pub fn flee_chance(rules: &FleeConfig, actor: &Combatant, target: &Combatant) -> f64 {
    let speed_diff = f64::from(actor.speed()) - f64::from(target.speed());
    let mut chance = rules.base_chance + speed_diff * rules.per_speed_point;
    if actor.health_fraction() <= rules.low_health_threshold {
        chance += rules.low_health_bonus;
    }
    chance.clamp(rules.min_chance, rules.max_chance)
}

fn flee(
    rules: &ActionRules,
    actor: &Combatant,
    target: &Combatant,
    rng: &mut dyn RandomSource,
) -> ActionOutcome {
    let chance = flee_chance(&rules.flee, actor, target);
    if rng.chance(chance) {
        ActionOutcome {
            success: true,
            description: format!("{} flees from combat!", actor.name()),
            ..ActionOutcome::default()
        }
    } else {
        ActionOutcome::failed(format!("{} tries to flee but fails!", actor.name()))
    }
}

fn poison(rules: &ActionRules, actor: &Combatant, target: &Combatant) -> ActionOutcome {
    let per_stack = rules.effects.poison_damage;
    let existing = target
        .status_effect(StatusEffectKind::Poisoned)
        .map(|p| p.damage_over_time());

    let description = match existing {
        None => format!(
            "{} releases toxic secretions, poisoning {}!",
            actor.name(),
            target.name()
        ),
        Some(dot) => format!(
            "{} intensifies the poison on {}! (Stack {})",
            actor.name(),
            target.name(),
            dot.checked_div(per_stack).unwrap_or(0) + 1
        ),
    };

    ActionOutcome {
        status_effects: vec![StatusEffect::poisoned(rules.effects.poison_duration, per_stack)],
        success: true,
        description,
        ..ActionOutcome::default()
    }
}

// =============================================================================
// Tests
// =============================================================================
