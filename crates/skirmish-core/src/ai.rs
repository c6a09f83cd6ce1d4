//! Combat AI: action and target selection.
//!
//! [`CombatAi`] is stateless. Every decision reads the actor, the opposing
//! combatants and the random source, and nothing else. Heroes and monsters
//! follow separate policies selected by [`CombatantKind`].
//!
//! Random draws are consumed only where a policy actually rolls, so a
//! scripted source stays aligned with the decisions it drives:
//! - a single target candidate is chosen without a draw
//! - a hero above the flee threshold never rolls for flee
//! - a combatant already defending never rolls for defend

use crate::action::ActionKind;
use crate::combatant::{Abilities, Combatant, CombatantKind};
use crate::config::AiConfig;
use crate::random::RandomSource;
use crate::status::StatusEffectKind;

/// Upper bound of the monster poison chance after the stacking bonus.
const MAX_POISON_CHANCE: f64 = 0.95;

/// Rule-based decision maker.
#[derive(Debug, Clone, Default)]
pub struct CombatAi {
    config: AiConfig,
}

impl CombatAi {
    /// Creates an AI with the given thresholds.
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Chooses what `actor` does this turn.
    ///
    /// `target` is the combatant already selected by
    /// [`select_target`](Self::select_target); monsters use it to decide
    /// whether to stack poison. `turn` is the combat's turn counter (1-based).
    pub fn determine_action(
        &self,
        actor: &Combatant,
        target: Option<&Combatant>,
        turn: u32,
        rng: &mut dyn RandomSource,
    ) -> ActionKind {
        match actor.kind() {
            CombatantKind::Hero => self.hero_action(actor, rng),
            CombatantKind::Monster => self.monster_action(actor, target, turn, rng),
        }
    }

    fn hero_action(&self, actor: &Combatant, rng: &mut dyn RandomSource) -> ActionKind {
        let cfg = &self.config;
        let hp = actor.health_fraction();

        if hp <= cfg.hero_flee_threshold && rng.chance(cfg.hero_flee_chance) {
            return ActionKind::Flee;
        }

        let defend_chance = if hp <= cfg.hero_critical_threshold {
            cfg.hero_critical_defend_chance
        } else if hp <= cfg.hero_wounded_threshold {
            cfg.hero_wounded_defend_chance
        } else {
            cfg.hero_baseline_defend_chance
        };
        if can_start_defending(actor) && rng.chance(defend_chance) {
            return ActionKind::Defend;
        }

        ActionKind::Attack
    }

    fn monster_action(
        &self,
        actor: &Combatant,
        target: Option<&Combatant>,
        turn: u32,
        rng: &mut dyn RandomSource,
    ) -> ActionKind {
        let cfg = &self.config;

        if actor.has_ability(Abilities::POISON) {
            let target_poisoned =
                target.is_some_and(|t| t.status_effect(StatusEffectKind::Poisoned).is_some());
            if rng.chance(self.poison_chance(turn, target_poisoned)) {
                return ActionKind::Special;
            }
        }

        let hp = actor.health_fraction();
        let defend_chance = if hp <= cfg.monster_critical_threshold {
            cfg.monster_critical_defend_chance
        } else if hp <= cfg.monster_wounded_threshold {
            cfg.monster_wounded_defend_chance
        } else {
            cfg.monster_baseline_defend_chance
        };
        if can_start_defending(actor) && rng.chance(defend_chance) {
            return ActionKind::Defend;
        }

        ActionKind::Attack
    }

    /// Probability that a poisonous monster uses its special on `turn`.
    ///
    /// Starts high and decays with every turn down to a floor; a target that
    /// is already poisoned adds a bonus.
    #[must_use]
    pub fn poison_chance(&self, turn: u32, target_poisoned: bool) -> f64 {
        let cfg = &self.config;
        let elapsed = f64::from(turn.saturating_sub(1));
        let mut chance =
            (cfg.poison_initial_chance - cfg.poison_decay_per_turn * elapsed).max(cfg.poison_min_chance);
        if target_poisoned {
            chance += cfg.poison_stack_bonus;
        }
        chance.min(MAX_POISON_CHANCE)
    }

    /// Picks the most threatening living candidate.
    ///
    /// A lone candidate is returned without consuming a random value. With
    /// several, each [`threat_score`] is scaled by a jitter drawn in candidate
    /// order and the first strictly highest result wins.
    pub fn select_target<'a>(
        &self,
        candidates: &[&'a Combatant],
        rng: &mut dyn RandomSource,
    ) -> Option<&'a Combatant> {
        let living: Vec<&'a Combatant> = candidates
            .iter()
            .copied()
            .filter(|c| c.is_alive())
            .collect();

        match living.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                let mut best: Option<(&'a Combatant, f64)> = None;
                for candidate in living {
                    let jitter = rng.range(self.config.target_jitter_min, self.config.target_jitter_max);
                    let score = threat_score(candidate) * jitter;
                    if best.map_or(true, |(_, top)| score > top) {
                        best = Some((candidate, score));
                    }
                }
                best.map(|(c, _)| c)
            }
        }
    }
}

fn can_start_defending(actor: &Combatant) -> bool {
    actor.has_ability(Abilities::DEFEND) && actor.status_effect(StatusEffectKind::Defending).is_none()
}

/// Heuristic danger rating of a potential target.
///
/// Higher means more urgent to kill. Well-armoured targets score lower.
#[must_use]
pub fn threat_score(target: &Combatant) -> f64 {
    let hp = target.health_percent();
    let attack = f64::from(target.attack());
    let mut score = 0.0;

    if target.attack() < 15 && target.speed() > 20 {
        score += 100.0;
    }
    if hp < 30.0 {
        score += 80.0 + (30.0 - hp);
    }
    if target.attack() > 25 {
        score += 60.0 + (attack - 25.0);
    }
    if (30.0..=60.0).contains(&hp) {
        score += 40.0 + (60.0 - hp);
    }
    if target.speed() > 25 {
        score += 15.0;
    }
    if target.defense() > 20 {
        score -= 20.0;
    }
    score
}
