//! Combat state and its transitions.
//!
//! [`Combat`] is the mutable aggregate for one encounter. It owns:
//! - Combatant storage, a flat vector indexed by [`CombatantId`]
//! - The two [`CombatTeam`]s, as ordered id lists
//! - The append-only [`CombatTurn`] log
//! - The [`InitiativeScheduler`] and therefore the combat clock
//! - The [`CombatOutcome`]
//!
//! All health and flee mutations go through the methods here so that the
//! clamping and liveness invariants hold after every call, and every turn
//! snapshot copies values out of storage rather than referencing it.
//!
//! # End conditions
//!
//! [`Combat::check_combat_end`] applies a fixed priority: any hero fled, then
//! all enemies dead, then all heroes dead.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::ActionStrategy;
use crate::combatant::{Combatant, CombatantId, CombatantKind};
use crate::config::{ExperiencePolicy, InitiativeConfig};
use crate::scheduler::InitiativeScheduler;
use crate::status::{StatusEffectKind, TickChange};

// =============================================================================
// Teams and outcome
// =============================================================================

/// Which side of the fight a team is on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    /// The player's party.
    Heroes,
    /// The opposition.
    Enemies,
}

impl TeamSide {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Heroes => Self::Enemies,
            Self::Enemies => Self::Heroes,
        }
    }
}

impl fmt::Display for TeamSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heroes => write!(f, "heroes"),
            Self::Enemies => write!(f, "enemies"),
        }
    }
}

/// An ordered list of combatants fighting on one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTeam {
    side: TeamSide,
    name: String,
    members: Vec<CombatantId>,
}

impl CombatTeam {
    /// Side tag.
    #[must_use]
    pub const fn side(&self) -> TeamSide {
        self.side
    }

    /// Display name built from the member names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member ids in roster order.
    #[must_use]
    pub fn members(&self) -> &[CombatantId] {
        &self.members
    }
}

/// Terminal classification of a combat.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatOutcome {
    /// Still being resolved.
    InProgress,
    /// Every enemy is dead.
    HeroVictory,
    /// Every hero is dead.
    HeroDefeat,
    /// A hero escaped.
    HeroFled,
    /// The turn ceiling was reached.
    Stalemate,
}

impl CombatOutcome {
    /// Returns true once the combat is over.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for CombatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::HeroVictory => write!(f, "victory"),
            Self::HeroDefeat => write!(f, "defeat"),
            Self::HeroFled => write!(f, "fled"),
            Self::Stalemate => write!(f, "stalemate"),
        }
    }
}

// =============================================================================
// Turn records
// =============================================================================

/// What kind of entry a turn is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnKind {
    /// A combatant resolved an action.
    Action(ActionStrategy),
    /// A combatant lost its turn (stunned).
    Skip,
    /// Damage or healing over time landed on a grid tick.
    StatusEffects,
}

/// The action part of a turn record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAction {
    /// Entry kind.
    pub kind: TurnKind,
    /// Narrative line.
    pub description: String,
    /// Damage dealt to the target.
    pub damage: Option<u32>,
    /// Healing restored to the actor.
    pub healing: Option<u32>,
    /// Effects applied by the action.
    pub status_effects: Vec<StatusEffectKind>,
    /// Whether the action worked.
    pub success: bool,
    /// Whether an attack was a critical hit.
    pub critical: bool,
}

/// An active effect as captured in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    /// Effect kind.
    pub kind: StatusEffectKind,
    /// Clock time of the first application.
    pub applied_at: u64,
    /// Clock time of expiry.
    pub expires_at: u64,
}

/// A combatant's state as captured in a turn record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    /// Combatant id.
    pub id: CombatantId,
    /// Combatant key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Hero or monster.
    pub kind: CombatantKind,
    /// Health at the time of the snapshot.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Whether the combatant was still fighting.
    pub is_alive: bool,
    /// Whether the combatant had escaped.
    pub has_fled: bool,
    /// Effects active at the time of the snapshot.
    pub active_status_effects: Vec<EffectSnapshot>,
}

impl CombatantSnapshot {
    fn capture(combatant: &Combatant) -> Self {
        Self {
            id: combatant.id(),
            key: combatant.key().to_string(),
            name: combatant.name().to_string(),
            kind: combatant.kind(),
            health: combatant.health(),
            max_health: combatant.max_health(),
            is_alive: combatant.is_alive(),
            has_fled: combatant.has_fled(),
            active_status_effects: combatant
                .status_effects()
                .iter()
                .map(|e| EffectSnapshot {
                    kind: e.kind(),
                    applied_at: e.applied_at(),
                    expires_at: e.expires_at(),
                })
                .collect(),
        }
    }
}

/// Immutable record of one resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTurn {
    /// Sequence number, starting at 1.
    pub sequence: u32,
    /// Combat clock at resolution.
    pub timestamp: u64,
    /// Acting combatant, absent for status ticks.
    pub actor: Option<CombatantId>,
    /// Targeted combatant, if any.
    pub target: Option<CombatantId>,
    /// What happened.
    pub action: TurnAction,
    /// Actor health after the action.
    pub actor_health_after: Option<u32>,
    /// Target health after the action.
    pub target_health_after: Option<u32>,
    /// Per-combatant changes of a status tick.
    pub status_changes: Vec<TickChange>,
    /// Every combatant at this instant.
    pub snapshot: Vec<CombatantSnapshot>,
}

impl CombatTurn {
    /// Snapshot entry for one combatant.
    #[must_use]
    pub fn snapshot_of(&self, id: CombatantId) -> Option<&CombatantSnapshot> {
        self.snapshot.iter().find(|s| s.id == id)
    }
}

// =============================================================================
// Combat
// =============================================================================

/// Mutable state of one encounter.
#[derive(Debug, Clone)]
pub struct Combat {
    combatants: Vec<Combatant>,
    hero_team: CombatTeam,
    enemy_team: CombatTeam,
    turns: Vec<CombatTurn>,
    turn_counter: u32,
    outcome: CombatOutcome,
    scheduler: InitiativeScheduler,
}

impl Combat {
    /// Creates the state for a new combat.
    ///
    /// Heroes are stored first, then enemies; each combatant's id is
    /// reassigned to its storage index. Status effects already present on
    /// the combatants are kept.
    #[must_use]
    pub fn new(
        heroes: Vec<Combatant>,
        enemies: Vec<Combatant>,
        initiative: InitiativeConfig,
    ) -> Self {
        let mut combatants = Vec::with_capacity(heroes.len() + enemies.len());
        let mut hero_ids = Vec::with_capacity(heroes.len());
        let mut enemy_ids = Vec::with_capacity(enemies.len());

        for (side, list) in [(TeamSide::Heroes, heroes), (TeamSide::Enemies, enemies)] {
            for mut combatant in list {
                let id = CombatantId::new(u32::try_from(combatants.len()).unwrap_or(u32::MAX));
                combatant.set_id(id);
                combatant.refresh_alive();
                match side {
                    TeamSide::Heroes => hero_ids.push(id),
                    TeamSide::Enemies => enemy_ids.push(id),
                }
                combatants.push(combatant);
            }
        }

        let hero_team = CombatTeam {
            side: TeamSide::Heroes,
            name: join_names(hero_ids.iter().map(|id| combatants[id.index()].name())),
            members: hero_ids,
        };
        let enemy_team = CombatTeam {
            side: TeamSide::Enemies,
            name: join_names(enemy_ids.iter().map(|id| combatants[id.index()].name())),
            members: enemy_ids,
        };

        Self {
            combatants,
            hero_team,
            enemy_team,
            turns: Vec::new(),
            turn_counter: 0,
            outcome: CombatOutcome::InProgress,
            scheduler: InitiativeScheduler::new(initiative),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// All combatants in id order.
    #[must_use]
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// Looks up a combatant.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this combat.
    #[must_use]
    pub fn combatant(&self, id: CombatantId) -> &Combatant {
        &self.combatants[id.index()]
    }

    /// Looks up a combatant for mutation.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this combat.
    #[must_use]
    pub fn combatant_mut(&mut self, id: CombatantId) -> &mut Combatant {
        &mut self.combatants[id.index()]
    }

    /// Looks up a combatant by its string key.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.key() == key)
    }

    /// The team on `side`.
    #[must_use]
    pub fn team(&self, side: TeamSide) -> &CombatTeam {
        match side {
            TeamSide::Heroes => &self.hero_team,
            TeamSide::Enemies => &self.enemy_team,
        }
    }

    /// Which side `id` fights on.
    #[must_use]
    pub fn side_of(&self, id: CombatantId) -> TeamSide {
        if self.hero_team.members.contains(&id) {
            TeamSide::Heroes
        } else {
            TeamSide::Enemies
        }
    }

    /// Members of the team on `side`, in roster order.
    pub fn members(&self, side: TeamSide) -> impl Iterator<Item = &Combatant> + '_ {
        self.team(side)
            .members
            .iter()
            .map(move |id| &self.combatants[id.index()])
    }

    /// Hero team members.
    pub fn heroes(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.members(TeamSide::Heroes)
    }

    /// Enemy team members.
    pub fn enemies(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.members(TeamSide::Enemies)
    }

    /// Members of the team opposing `id`.
    #[must_use]
    pub fn opposing_members(&self, id: CombatantId) -> Vec<&Combatant> {
        self.members(self.side_of(id).opponent()).collect()
    }

    /// Ids of every combatant still fighting.
    #[must_use]
    pub fn living_combatants(&self) -> Vec<CombatantId> {
        self.combatants
            .iter()
            .filter(|c| c.is_alive())
            .map(Combatant::id)
            .collect()
    }

    /// Turn log in order.
    #[must_use]
    pub fn turns(&self) -> &[CombatTurn] {
        &self.turns
    }

    /// Number of loop iterations so far.
    #[must_use]
    pub const fn turn_counter(&self) -> u32 {
        self.turn_counter
    }

    /// Current outcome.
    #[must_use]
    pub const fn outcome(&self) -> CombatOutcome {
        self.outcome
    }

    /// Initiative scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &InitiativeScheduler {
        &self.scheduler
    }

    /// Current combat clock.
    #[must_use]
    pub const fn current_time(&self) -> u64 {
        self.scheduler.current_time()
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Schedules every living combatant from the current clock.
    pub fn initialize_scheduler(&mut self) {
        let entries: Vec<_> = self
            .combatants
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| (c.id(), c.speed()))
            .collect();
        self.scheduler.initialize(entries);
    }

    /// Pulls the next actor from the scheduler, advancing the clock.
    pub fn next_actor(&mut self) -> Option<CombatantId> {
        let combatants = &self.combatants;
        self.scheduler
            .next_actor(|id| combatants[id.index()].is_alive())
    }

    /// Advances the turn counter and returns the new value.
    pub fn increment_turn(&mut self) -> u32 {
        self.turn_counter += 1;
        self.turn_counter
    }

    /// Subtracts up to `amount` health and returns what was actually removed.
    pub fn apply_damage(&mut self, id: CombatantId, amount: u32) -> u32 {
        let combatant = &mut self.combatants[id.index()];
        let dealt = amount.min(combatant.health());
        combatant.set_health(combatant.health() - dealt);
        dealt
    }

    /// Adds up to `amount` health, capped at max, and returns what was restored.
    pub fn apply_healing(&mut self, id: CombatantId, amount: u32) -> u32 {
        let combatant = &mut self.combatants[id.index()];
        let restored = amount.min(combatant.max_health() - combatant.health());
        combatant.set_health(combatant.health() + restored);
        restored
    }

    /// Marks a combatant as escaped; it is no longer alive in the fight.
    pub fn set_combatant_fled(&mut self, id: CombatantId) {
        self.combatants[id.index()].mark_fled();
    }

    /// Recomputes every combatant's liveness from health and the flee flag.
    pub fn update_combatant_states(&mut self) {
        for combatant in &mut self.combatants {
            combatant.refresh_alive();
        }
    }

    /// Evaluates the end conditions and records the outcome.
    ///
    /// Priority: any hero fled, then all enemies dead, then all heroes dead.
    /// Once finished, the outcome never changes.
    pub fn check_combat_end(&mut self) -> CombatOutcome {
        if self.outcome.is_finished() {
            return self.outcome;
        }

        let outcome = if self.heroes().any(Combatant::has_fled) {
            CombatOutcome::HeroFled
        } else if self.enemies().all(|c| !c.is_alive()) {
            CombatOutcome::HeroVictory
        } else if self.heroes().all(|c| !c.is_alive()) {
            CombatOutcome::HeroDefeat
        } else {
            CombatOutcome::InProgress
        };

        if outcome.is_finished() {
            debug!(%outcome, turn = self.turn_counter, "combat ended");
        }
        self.outcome = outcome;
        outcome
    }

    /// Ends an unfinished combat as a stalemate.
    pub fn declare_stalemate(&mut self) {
        if !self.outcome.is_finished() {
            self.outcome = CombatOutcome::Stalemate;
        }
    }

    /// Copies the current state of every combatant.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CombatantSnapshot> {
        self.combatants.iter().map(CombatantSnapshot::capture).collect()
    }

    /// Assembles a turn record at the current clock time.
    #[must_use]
    pub fn build_turn(
        &self,
        sequence: u32,
        actor: Option<CombatantId>,
        target: Option<CombatantId>,
        action: TurnAction,
        status_changes: Vec<TickChange>,
    ) -> CombatTurn {
        CombatTurn {
            sequence,
            timestamp: self.current_time(),
            actor,
            target,
            action,
            actor_health_after: actor.map(|id| self.combatant(id).health()),
            target_health_after: target.map(|id| self.combatant(id).health()),
            status_changes,
            snapshot: self.snapshot(),
        }
    }

    /// Appends a record to the turn log.
    pub fn push_turn(&mut self, turn: CombatTurn) {
        self.turns.push(turn);
    }

    /// Sequence number for the next log entry.
    #[must_use]
    pub fn next_sequence(&self) -> u32 {
        u32::try_from(self.turns.len()).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    /// Experience earned from enemies that were killed (not fled).
    ///
    /// Saturates at `u32::MAX`.
    #[must_use]
    pub fn calculate_experience_gained(&self, policy: ExperiencePolicy) -> u32 {
        self.enemies()
            .filter(|c| c.is_defeated())
            .map(|c| match policy {
                ExperiencePolicy::StatFormula => c
                    .attack()
                    .saturating_add(c.defense())
                    .saturating_add(c.speed())
                    .saturating_mul(2),
                ExperiencePolicy::RecordReward => c.experience_reward(),
            })
            .fold(0, u32::saturating_add)
    }

    /// One deterministic sentence describing how the combat went.
    #[must_use]
    pub fn generate_combat_summary(&self) -> String {
        let heroes = self.hero_team.name();
        let enemies = self.enemy_team.name();
        let turns = self.turn_counter;
        match self.outcome {
            CombatOutcome::InProgress => {
                format!("The fight between {heroes} and {enemies} is still undecided.")
            }
            CombatOutcome::HeroVictory => {
                format!("{heroes} defeated {enemies} in {turns} turns.")
            }
            CombatOutcome::HeroDefeat => format!("{heroes} fell to {enemies} in {turns} turns."),
            CombatOutcome::HeroFled => {
                let fled = join_names(
                    self.heroes()
                        .filter(|c| c.has_fled())
                        .map(Combatant::name),
                );
                format!("{fled} fled from {enemies} after {turns} turns.")
            }
            CombatOutcome::Stalemate => {
                format!("{heroes} and {enemies} fought to a standstill after {turns} turns.")
            }
        }
    }
}

/// Joins names as "A", "A and B", or "A, B and C".
fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

// =============================================================================
// Tests
// =============================================================================
