//! Combat orchestration.
//!
//! [`CombatOrchestrator`] turns external records into a [`Combat`] and
//! drives it to an outcome. The loop lives in [`CombatSession`], which can be
//! stepped one iteration at a time:
//!
//! ```text
//! Initializing -> Looping -> Victory | Defeat | Fled | Stalemate
//! ```
//!
//! Each `Looping` iteration:
//!
//! 1. Increment the turn counter (schedule everyone on the first one)
//! 2. Pull the next actor, advancing the clock
//! 3. Process every tick-grid point the clock crossed
//! 4. Run the expiration pass and check for an end
//! 5. Skip a stunned actor, otherwise select target and action and execute
//! 6. Update liveness and check for an end
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::CombatConfig;
//! use skirmish_core::entity::{HeroRecord, MonsterRecord};
//! use skirmish_core::orchestrator::CombatOrchestrator;
//! use skirmish_core::random::ScriptedRandom;
//! use skirmish_core::state::CombatOutcome;
//!
//! let orchestrator = CombatOrchestrator::new(CombatConfig::default()).unwrap();
//! let result = orchestrator
//!     .run(
//!         &[HeroRecord::new("Aria", 100, 20, 10, 15)],
//!         &[MonsterRecord::new("Rat", 20, 6, 4, 5)],
//!         ScriptedRandom::constant(0.5),
//!     )
//!     .unwrap();
//!
//! assert_eq!(result.outcome, CombatOutcome::HeroVictory);
//! assert_eq!(result.experience_gained, 30);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::ActionRules;
use crate::ai::CombatAi;
use crate::combatant::{CombatantId, CombatantKind};
use crate::config::CombatConfig;
use crate::entity::{EntityConverter, HeroRecord, MonsterRecord};
use crate::error::CombatError;
use crate::executor::ActionExecutor;
use crate::random::RandomSource;
use crate::state::{Combat, CombatOutcome, CombatTurn, CombatantSnapshot, TeamSide};
use crate::status::{Application, StatusEffect, StatusEffectEngine};

// =============================================================================
// Phase
// =============================================================================

/// Where a [`CombatSession`] is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Created, nothing resolved yet.
    Initializing,
    /// Resolving turns.
    Looping,
    /// Every enemy died.
    Victory,
    /// Every hero died.
    Defeat,
    /// A hero escaped.
    Fled,
    /// The turn ceiling was reached.
    Stalemate,
}

impl CombatPhase {
    /// Returns true for the four end states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Victory | Self::Defeat | Self::Fled | Self::Stalemate
        )
    }

    fn from_outcome(outcome: CombatOutcome) -> Self {
        match outcome {
            CombatOutcome::InProgress => Self::Looping,
            CombatOutcome::HeroVictory => Self::Victory,
            CombatOutcome::HeroDefeat => Self::Defeat,
            CombatOutcome::HeroFled => Self::Fled,
            CombatOutcome::Stalemate => Self::Stalemate,
        }
    }
}

impl fmt::Display for CombatPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Looping => write!(f, "looping"),
            Self::Victory => write!(f, "victory"),
            Self::Defeat => write!(f, "defeat"),
            Self::Fled => write!(f, "fled"),
            Self::Stalemate => write!(f, "stalemate"),
        }
    }
}

// =============================================================================
// Result
// =============================================================================

/// Everything the caller gets back from a finished combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatResult {
    /// How the combat ended.
    pub outcome: CombatOutcome,
    /// The full turn log.
    pub turns: Vec<CombatTurn>,
    /// Experience earned by the heroes.
    pub experience_gained: u32,
    /// One-sentence summary.
    pub summary: String,
    /// Loop iterations resolved.
    pub turn_count: u32,
    /// Combat clock at the end.
    pub elapsed_time: u64,
    /// Every combatant as the combat ended.
    pub final_state: Vec<CombatantSnapshot>,
}

impl CombatResult {
    /// Final snapshot of the combatant with `key`.
    #[must_use]
    pub fn combatant(&self, key: &str) -> Option<&CombatantSnapshot> {
        self.final_state.iter().find(|s| s.key == key)
    }

    /// Final health of the combatant with `key`.
    #[must_use]
    pub fn final_health(&self, key: &str) -> Option<u32> {
        self.combatant(key).map(|s| s.health)
    }

    /// Final hero snapshots in roster order.
    pub fn heroes(&self) -> impl Iterator<Item = &CombatantSnapshot> + '_ {
        self.final_state
            .iter()
            .filter(|s| s.kind == CombatantKind::Hero)
    }

    /// Writes final health back into the records the combat was built from.
    ///
    /// `heroes` must be the same slice, in the same order, that was passed
    /// to the orchestrator.
    pub fn carry_over(&self, heroes: &mut [HeroRecord]) {
        for (index, record) in heroes.iter_mut().enumerate() {
            let key = format!("hero-{index}-{}", record.name);
            if let Some(health) = self.final_health(&key) {
                record.health = health;
            }
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// One combat being resolved step by step.
///
/// The session exclusively owns its combat state and random source.
pub struct CombatSession<R: RandomSource> {
    config: CombatConfig,
    combat: Combat,
    executor: ActionExecutor,
    ai: CombatAi,
    effects: StatusEffectEngine,
    rng: R,
    phase: CombatPhase,
    last_grid_point: u64,
}

impl<R: RandomSource> fmt::Debug for CombatSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatSession")
            .field("phase", &self.phase)
            .field("turn", &self.combat.turn_counter())
            .field("time", &self.combat.current_time())
            .field("last_grid_point", &self.last_grid_point)
            .finish_non_exhaustive()
    }
}

impl<R: RandomSource> CombatSession<R> {
    /// Converts the records and prepares a combat.
    ///
    /// # Errors
    ///
    /// Fails on an empty side, invalid records or an invalid configuration.
    pub fn new(
        heroes: &[HeroRecord],
        monsters: &[MonsterRecord],
        config: CombatConfig,
        rng: R,
    ) -> Result<Self, CombatError> {
        config.validate()?;
        if heroes.is_empty() {
            return Err(CombatError::EmptyTeam { side: "hero" });
        }
        if monsters.is_empty() {
            return Err(CombatError::EmptyTeam { side: "monster" });
        }

        let combat = Combat::new(
            EntityConverter::convert_heroes(heroes)?,
            EntityConverter::convert_monsters(monsters)?,
            config.initiative,
        );

        Ok(Self {
            executor: ActionExecutor::new(ActionRules::from_config(&config)),
            ai: CombatAi::new(config.ai),
            effects: StatusEffectEngine::new(config.effects),
            config,
            combat,
            rng,
            phase: CombatPhase::Initializing,
            last_grid_point: 0,
        })
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Live combat state.
    #[must_use]
    pub fn combat(&self) -> &Combat {
        &self.combat
    }

    /// Applies `effect` to a combatant at the current clock time.
    ///
    /// Lets callers set up pre-combat conditions, such as a hero entering
    /// the fight already poisoned.
    pub fn apply_status_effect(&mut self, id: CombatantId, effect: StatusEffect) -> Application {
        let now = self.combat.current_time();
        self.effects
            .apply_status_effect(self.combat.combatant_mut(id), effect, now)
    }

    /// Advances by one state-machine transition and returns the new phase.
    ///
    /// Calling it in a terminal phase does nothing.
    pub fn step(&mut self) -> CombatPhase {
        match self.phase {
            CombatPhase::Initializing => {
                info!(
                    heroes = self.combat.team(TeamSide::Heroes).name(),
                    enemies = self.combat.team(TeamSide::Enemies).name(),
                    "combat started"
                );
                self.phase = CombatPhase::Looping;
            }
            CombatPhase::Looping => {
                self.iterate();
                self.phase = CombatPhase::from_outcome(self.combat.outcome());
                if self.phase.is_terminal() {
                    info!(
                        outcome = %self.combat.outcome(),
                        turns = self.combat.turn_counter(),
                        time = self.combat.current_time(),
                        "combat finished"
                    );
                }
            }
            _ => {}
        }
        self.phase
    }

    /// Steps until the combat is over.
    pub fn run_to_end(&mut self) -> CombatPhase {
        while !self.phase.is_terminal() {
            self.step();
        }
        self.phase
    }

    /// Finishes the combat if needed and packages the result.
    #[must_use]
    pub fn into_result(mut self) -> CombatResult {
        self.run_to_end();
        let combat = self.combat;
        CombatResult {
            outcome: combat.outcome(),
            experience_gained: combat.calculate_experience_gained(self.config.experience),
            summary: combat.generate_combat_summary(),
            turn_count: combat.turn_counter(),
            elapsed_time: combat.current_time(),
            final_state: combat.snapshot(),
            turns: combat.turns().to_vec(),
        }
    }

    fn iterate(&mut self) {
        if self.combat.turn_counter() >= self.config.max_turns {
            self.combat.declare_stalemate();
            return;
        }

        let turn = self.combat.increment_turn();
        if turn == 1 {
            self.combat.initialize_scheduler();
        }

        let Some(actor) = self.combat.next_actor() else {
            // Nobody can act: either one side is gone or nothing can change.
            if !self.combat.check_combat_end().is_finished() {
                self.combat.declare_stalemate();
            }
            return;
        };

        self.process_ticks();

        let now = self.combat.current_time();
        for id in self.combat.living_combatants() {
            self.effects
                .process_status_effects(self.combat.combatant_mut(id), now);
        }
        self.combat.update_combatant_states();
        if self.combat.check_combat_end().is_finished() {
            return;
        }

        // The tick may have killed the actor.
        if !self.combat.combatant(actor).is_alive() {
            return;
        }

        if !self.effects.can_act(self.combat.combatant(actor)) {
            let record = self
                .executor
                .skip_turn(self.combat.next_sequence(), actor, &self.combat);
            debug!(turn, actor = %actor, "stunned actor skipped");
            self.combat.push_turn(record);
            return;
        }

        let opponents = self.combat.opposing_members(actor);
        let Some(target) = self.ai.select_target(&opponents, &mut self.rng) else {
            self.combat.check_combat_end();
            return;
        };
        let kind = self.ai.determine_action(
            self.combat.combatant(actor),
            Some(target),
            turn,
            &mut self.rng,
        );
        let target = target.id();

        let record = self.executor.execute_turn(
            self.combat.next_sequence(),
            actor,
            target,
            kind,
            &mut self.combat,
            &mut self.rng,
        );
        self.combat.push_turn(record);
        self.combat.update_combatant_states();
        self.combat.check_combat_end();
    }

    /// Evaluates every grid point in `(last_grid_point, now]`.
    fn process_ticks(&mut self) {
        let interval = self.config.tick_interval;
        let now = self.combat.current_time();
        let mut grid_point = self.last_grid_point + interval;
        while grid_point <= now {
            let report = self
                .effects
                .process_time_based_status_effects(&mut self.combat, grid_point);
            if report.should_create_turn {
                debug!(time = grid_point, messages = report.messages.len(), "status tick");
                let record = self
                    .executor
                    .status_turn(self.combat.next_sequence(), report, &self.combat);
                self.combat.push_turn(record);
            }
            self.last_grid_point = grid_point;
            grid_point += interval;
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Entry point for resolving combats with one configuration.
#[derive(Debug, Clone, Default)]
pub struct CombatOrchestrator {
    config: CombatConfig,
}

impl CombatOrchestrator {
    /// Creates an orchestrator after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::Config`] if the configuration is invalid.
    pub fn new(config: CombatConfig) -> Result<Self, CombatError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Prepares a combat without resolving it.
    ///
    /// # Errors
    ///
    /// Fails on an empty side or invalid records.
    pub fn session<R: RandomSource>(
        &self,
        heroes: &[HeroRecord],
        monsters: &[MonsterRecord],
        rng: R,
    ) -> Result<CombatSession<R>, CombatError> {
        CombatSession::new(heroes, monsters, self.config.clone(), rng)
    }

    /// Resolves a whole combat.
    ///
    /// # Errors
    ///
    /// Fails on an empty side or invalid records.
    pub fn run<R: RandomSource>(
        &self,
        heroes: &[HeroRecord],
        monsters: &[MonsterRecord],
        rng: R,
    ) -> Result<CombatResult, CombatError> {
        Ok(self.session(heroes, monsters, rng)?.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;
    use crate::state::TurnKind;
    use crate::tests::helpers::{hero, monster, poisonous_monster};

    fn orchestrator() -> CombatOrchestrator {
        CombatOrchestrator::default()
    }

    mod phase_tests {
        use super::*;

        #[test]
        fn phases_advance_in_order() {
            let mut session = orchestrator()
                .session(
                    &[hero("Aria", 100, 20, 10, 15)],
                    &[monster("Rat", 20, 6, 4, 5)],
                    ScriptedRandom::constant(0.5),
                )
                .unwrap();
            assert_eq!(session.phase(), CombatPhase::Initializing);
            assert_eq!(session.step(), CombatPhase::Looping);
            assert_eq!(session.combat().turn_counter(), 0);

            // t=55 Aria hits, t=85 Rat hits, t=110 Aria kills.
            assert_eq!(session.step(), CombatPhase::Looping);
            assert_eq!(session.step(), CombatPhase::Looping);
            assert_eq!(session.step(), CombatPhase::Victory);
            assert_eq!(session.step(), CombatPhase::Victory);
            assert_eq!(session.combat().turn_counter(), 3);
        }

        #[test]
        fn empty_sides_are_rejected() {
            let err = orchestrator()
                .run(&[], &[monster("Rat", 20, 6, 4, 5)], ScriptedRandom::constant(0.5))
                .unwrap_err();
            assert!(matches!(err, CombatError::EmptyTeam { side: "hero" }));

            let err = orchestrator()
                .run(&[hero("Aria", 100, 20, 10, 15)], &[], ScriptedRandom::constant(0.5))
                .unwrap_err();
            assert!(matches!(err, CombatError::EmptyTeam { side: "monster" }));
        }

        #[test]
        fn invalid_config_is_rejected() {
            let config = CombatConfig {
                tick_interval: 0,
                ..CombatConfig::default()
            };
            assert!(matches!(
                CombatOrchestrator::new(config),
                Err(CombatError::Config(_))
            ));
        }
    }

    mod ceiling_tests {
        use super::*;

        #[test]
        fn turn_ceiling_ends_in_stalemate() {
            let config = CombatConfig {
                max_turns: 10,
                ..CombatConfig::default()
            };
            let result = CombatOrchestrator::new(config)
                .unwrap()
                .run(
                    &[hero("Wall", 10_000, 1, 50, 10)],
                    &[monster("Stone", 10_000, 1, 50, 10)],
                    ScriptedRandom::constant(0.5),
                )
                .unwrap();
            assert_eq!(result.outcome, CombatOutcome::Stalemate);
            assert_eq!(result.turn_count, 10);
            assert_eq!(result.experience_gained, 0);
            assert_eq!(
                result.summary,
                "Wall and Stone fought to a standstill after 10 turns."
            );
        }
    }

    mod effect_tests {
        use super::*;

        #[test]
        fn stunned_actor_loses_turn() {
            let mut session = orchestrator()
                .session(
                    &[hero("Aria", 100, 20, 10, 15)],
                    &[monster("Rat", 200, 6, 4, 5)],
                    ScriptedRandom::constant(0.5),
                )
                .unwrap();
            let aria = session.combat().team(TeamSide::Heroes).members()[0];
            session.apply_status_effect(aria, StatusEffect::stunned(60));
            session.step();
            session.step();

            let first = &session.combat().turns()[0];
            assert_eq!(first.action.kind, TurnKind::Skip);
            assert_eq!(first.actor, Some(aria));
            assert_eq!(session.combat().combatant(CombatantId::new(1)).health(), 200);
        }

        #[test]
        fn poison_produces_status_turns() {
            let result = orchestrator()
                .run(
                    &[hero("Aria", 100, 20, 10, 15)],
                    &[poisonous_monster("Spider", 200, 6, 4, 12)],
                    ScriptedRandom::constant(0.5),
                )
                .unwrap();
            let ticks: Vec<_> = result
                .turns
                .iter()
                .filter(|t| t.action.kind == TurnKind::StatusEffects)
                .collect();
            assert!(!ticks.is_empty());
            assert!(ticks.iter().all(|t| t.actor.is_none() && t.target.is_none()));
            assert!(ticks.iter().all(|t| !t.status_changes.is_empty()));
        }

        #[test]
        fn sequence_numbers_are_contiguous() {
            let result = orchestrator()
                .run(
                    &[hero("Aria", 100, 20, 10, 15)],
                    &[poisonous_monster("Spider", 200, 6, 4, 12)],
                    ScriptedRandom::constant(0.5),
                )
                .unwrap();
            for (i, turn) in result.turns.iter().enumerate() {
                assert_eq!(turn.sequence as usize, i + 1);
            }
        }
    }

    mod result_tests {
        use super::*;

        #[test]
        fn carry_over_updates_hero_health() {
            let mut heroes = vec![hero("Aria", 100, 20, 10, 15)];
            let result = orchestrator()
                .run(&heroes, &[monster("Rat", 20, 6, 4, 5)], ScriptedRandom::constant(0.5))
                .unwrap();
            result.carry_over(&mut heroes);
            assert_eq!(heroes[0].health, 99);
            assert_eq!(result.final_health("hero-0-Aria"), Some(99));
            assert_eq!(result.final_health("monster-0-Rat"), Some(0));
            assert_eq!(result.heroes().count(), 1);
        }

        #[test]
        fn result_serializes() {
            let result = orchestrator()
                .run(
                    &[hero("Aria", 100, 20, 10, 15)],
                    &[monster("Rat", 20, 6, 4, 5)],
                    ScriptedRandom::constant(0.5),
                )
                .unwrap();
            let json = serde_json::to_string(&result).unwrap();
            let back: CombatResult = serde_json::from_str(&json).unwrap();
            assert_eq!(back, result);
        }
    }
}
