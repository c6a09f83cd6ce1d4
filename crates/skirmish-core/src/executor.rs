//! Turn execution.
//!
//! The [`ActionExecutor`] commits what a strategy computed: damage to the
//! target, healing to the actor, effects to the right recipient and the flee
//! flag. It then assembles the [`CombatTurn`] record, snapshot included.
//!
//! Skip turns (stunned actors) and status tick turns are also built here so
//! every log entry comes from one place.

use tracing::debug;

use crate::action::{ActionKind, ActionRules, ActionStrategy};
use crate::combatant::CombatantId;
use crate::random::RandomSource;
use crate::state::{Combat, CombatTurn, TurnAction, TurnKind};
use crate::status::{StatusEffectKind, TickReport};

/// Applies action outcomes to a combat and records them.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    rules: ActionRules,
}

impl ActionExecutor {
    /// Creates an executor using `rules`.
    #[must_use]
    pub fn new(rules: ActionRules) -> Self {
        Self { rules }
    }

    /// Balance rules in use.
    #[must_use]
    pub fn rules(&self) -> &ActionRules {
        &self.rules
    }

    /// Resolves `kind` for `actor` against `target` and commits the result.
    ///
    /// An outcome that failed (including a strategy that cannot execute)
    /// changes nothing but is still recorded.
    pub fn execute_turn(
        &self,
        turn_number: u32,
        actor: CombatantId,
        target: CombatantId,
        kind: ActionKind,
        combat: &mut Combat,
        rng: &mut dyn RandomSource,
    ) -> CombatTurn {
        let strategy = ActionStrategy::resolve(kind, combat.combatant(actor));
        let outcome = strategy.execute(
            &self.rules,
            combat.combatant(actor),
            combat.combatant(target),
            rng,
        );

        if outcome.success {
            let now = combat.current_time();
            if let Some(damage) = outcome.damage {
                combat.apply_damage(target, damage);
            }
            if let Some(healing) = outcome.healing {
                combat.apply_healing(actor, healing);
            }
            let recipient = if strategy == ActionStrategy::Defend {
                actor
            } else {
                target
            };
            for effect in &outcome.status_effects {
                self.rules.engine.apply_status_effect(
                    combat.combatant_mut(recipient),
                    effect.clone(),
                    now,
                );
            }
            if strategy == ActionStrategy::Flee {
                combat.set_combatant_fled(actor);
            }
        }

        debug!(
            turn = turn_number,
            actor = %actor,
            target = %target,
            %strategy,
            success = outcome.success,
            damage = outcome.damage,
            "resolved action"
        );

        let action = TurnAction {
            kind: TurnKind::Action(strategy),
            description: outcome.description,
            damage: outcome.damage.filter(|_| outcome.success),
            healing: outcome.healing.filter(|_| outcome.success),
            status_effects: if outcome.success {
                outcome.status_effects.iter().map(|e| e.kind).collect()
            } else {
                Vec::new()
            },
            success: outcome.success,
            critical: outcome.critical,
        };
        combat.build_turn(turn_number, Some(actor), Some(target), action, Vec::new())
    }

    /// Records a lost turn for a stunned actor.
    #[must_use]
    pub fn skip_turn(&self, turn_number: u32, actor: CombatantId, combat: &Combat) -> CombatTurn {
        let name = combat.combatant(actor).name();
        let action = TurnAction {
            kind: TurnKind::Skip,
            description: format!("{name} is stunned and cannot act!"),
            damage: None,
            healing: None,
            status_effects: vec![StatusEffectKind::Stunned],
            success: false,
            critical: false,
        };
        combat.build_turn(turn_number, Some(actor), None, action, Vec::new())
    }

    /// Records the effects of a grid tick.
    #[must_use]
    pub fn status_turn(&self, turn_number: u32, report: TickReport, combat: &Combat) -> CombatTurn {
        let damage: u32 = report.changes.iter().map(|c| c.damage).sum();
        let healing: u32 = report.changes.iter().map(|c| c.healing).sum();
        let action = TurnAction {
            kind: TurnKind::StatusEffects,
            description: report.messages.join(" "),
            damage: (damage > 0).then_some(damage),
            healing: (healing > 0).then_some(healing),
            status_effects: Vec::new(),
            success: true,
            critical: false,
        };
        combat.build_turn(turn_number, None, None, action, report.changes)
    }
}
