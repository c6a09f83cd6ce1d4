//! Cosmetic narration of finished combats.
//!
//! The narrator never touches combat state. It reads a [`CombatResult`],
//! classifies how intense the fight was and picks flavour lines from fixed
//! pools with the supplied random source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantKind;
use crate::orchestrator::CombatResult;
use crate::random::RandomSource;
use crate::state::{CombatOutcome, CombatTurn, TurnKind};

/// How hard a fight was.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatIntensity {
    /// Over in a handful of turns.
    Routine,
    /// An ordinary fight.
    Contested,
    /// Long or bloody.
    Grueling,
    /// A hero came close to death.
    Desperate,
}

impl fmt::Display for CombatIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routine => write!(f, "routine"),
            Self::Contested => write!(f, "contested"),
            Self::Grueling => write!(f, "grueling"),
            Self::Desperate => write!(f, "desperate"),
        }
    }
}

/// Narrative text produced for one combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    /// Intensity classification.
    pub intensity: CombatIntensity,
    /// Opening line.
    pub opening: String,
    /// The hardest hit of the fight, if any damage was dealt.
    pub highlight: Option<String>,
    /// Closing line.
    pub closing: String,
}

impl fmt::Display for Narration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opening)?;
        if let Some(highlight) = &self.highlight {
            write!(f, " {highlight}")?;
        }
        write!(f, " {}", self.closing)
    }
}

const ROUTINE_OPENINGS: &[&str] = &[
    "The skirmish was over almost before it began.",
    "It was a brief affair.",
    "Steel flashed only a few times.",
];
const CONTESTED_OPENINGS: &[&str] = &[
    "Both sides traded blows in earnest.",
    "The fight swung back and forth.",
    "Neither side gave ground easily.",
];
const GRUELING_OPENINGS: &[&str] = &[
    "The battle dragged on until every arm ached.",
    "It was a long and bloody struggle.",
    "Exhaustion hung over the field long before the end.",
];
const DESPERATE_OPENINGS: &[&str] = &[
    "Death came within a hair's breadth.",
    "For a moment all seemed lost.",
    "The heroes fought with their backs to the wall.",
];

const VICTORY_CLOSINGS: &[&str] = &[
    "The heroes stood victorious.",
    "The last foe fell, and silence returned.",
    "Victory, hard-won or not, belonged to the heroes.",
];
const DEFEAT_CLOSINGS: &[&str] = &[
    "The heroes fell, one after another.",
    "Darkness closed over the party.",
    "No hero remained standing.",
];
const FLED_CLOSINGS: &[&str] = &[
    "Discretion proved the better part of valour.",
    "The heroes lived to fight another day.",
    "A hasty retreat ended the fight.",
];
const STALEMATE_CLOSINGS: &[&str] = &[
    "Neither side could finish the other.",
    "The combatants drew apart, spent and unbeaten.",
    "The fight simply ran out of strength.",
];
const UNFINISHED_CLOSINGS: &[&str] = &["The fight goes on."];

/// Thresholds for [`CombatIntensity`] classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatNarrator {
    /// At or below this many turns a fight is routine.
    pub routine_max_turns: u32,
    /// At or above this many turns a fight is grueling.
    pub grueling_min_turns: u32,
    /// At or above this much total damage a fight is grueling.
    pub grueling_min_damage: u64,
    /// A hero at or below this health fraction makes a fight desperate.
    pub desperate_health_fraction: f64,
}

impl Default for CombatNarrator {
    fn default() -> Self {
        Self {
            routine_max_turns: 5,
            grueling_min_turns: 30,
            grueling_min_damage: 500,
            desperate_health_fraction: 0.2,
        }
    }
}

impl CombatNarrator {
    /// Classifies how intense `result` was.
    #[must_use]
    pub fn classify(&self, result: &CombatResult) -> CombatIntensity {
        let lowest = lowest_hero_health(&result.turns);
        if lowest.is_some_and(|f| f > 0.0 && f <= self.desperate_health_fraction) {
            return CombatIntensity::Desperate;
        }
        let damage = total_damage(&result.turns);
        if result.turn_count >= self.grueling_min_turns || damage >= self.grueling_min_damage {
            CombatIntensity::Grueling
        } else if result.turn_count <= self.routine_max_turns {
            CombatIntensity::Routine
        } else {
            CombatIntensity::Contested
        }
    }

    /// Builds the narration for `result`.
    ///
    /// Draws exactly two random values: one for the opening, one for the
    /// closing.
    pub fn narrate(&self, result: &CombatResult, rng: &mut dyn RandomSource) -> Narration {
        let intensity = self.classify(result);
        let openings = match intensity {
            CombatIntensity::Routine => ROUTINE_OPENINGS,
            CombatIntensity::Contested => CONTESTED_OPENINGS,
            CombatIntensity::Grueling => GRUELING_OPENINGS,
            CombatIntensity::Desperate => DESPERATE_OPENINGS,
        };
        let closings = match result.outcome {
            CombatOutcome::HeroVictory => VICTORY_CLOSINGS,
            CombatOutcome::HeroDefeat => DEFEAT_CLOSINGS,
            CombatOutcome::HeroFled => FLED_CLOSINGS,
            CombatOutcome::Stalemate => STALEMATE_CLOSINGS,
            CombatOutcome::InProgress => UNFINISHED_CLOSINGS,
        };

        let opening = openings[rng.pick_index(openings.len())].to_string();
        let closing = closings[rng.pick_index(closings.len())].to_string();
        let highlight = hardest_hit(&result.turns)
            .map(|turn| format!("The hardest blow: {}", turn.action.description));

        Narration {
            intensity,
            opening,
            highlight,
            closing,
        }
    }
}

fn total_damage(turns: &[CombatTurn]) -> u64 {
    turns
        .iter()
        .filter_map(|t| t.action.damage)
        .map(u64::from)
        .sum()
}

fn hardest_hit(turns: &[CombatTurn]) -> Option<&CombatTurn> {
    turns
        .iter()
        .filter(|t| matches!(t.action.kind, TurnKind::Action(_)))
        .filter(|t| t.action.damage.is_some_and(|d| d > 0))
        // Earliest turn wins ties.
        .rev()
        .max_by_key(|t| t.action.damage)
}

fn lowest_hero_health(turns: &[CombatTurn]) -> Option<f64> {
    turns
        .iter()
        .flat_map(|t| t.snapshot.iter())
        .filter(|s| s.kind == CombatantKind::Hero && s.max_health > 0)
        .map(|s| f64::from(s.health) / f64::from(s.max_health))
        .min_by(f64::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::CombatOrchestrator;
    use crate::random::ScriptedRandom;
    use crate::tests::helpers::{hero, monster};

    fn quick_win() -> CombatResult {
        CombatOrchestrator::default()
            .run(
                &[hero("Aria", 100, 20, 10, 15)],
                &[monster("Rat", 20, 6, 4, 5)],
                ScriptedRandom::constant(0.5),
            )
            .unwrap()
    }

    #[test]
    fn short_fight_is_routine() {
        assert_eq!(CombatNarrator::default().classify(&quick_win()), CombatIntensity::Routine);
    }

    #[test]
    fn long_fight_is_grueling() {
        let narrator = CombatNarrator {
            grueling_min_turns: 2,
            ..CombatNarrator::default()
        };
        assert_eq!(narrator.classify(&quick_win()), CombatIntensity::Grueling);
    }

    #[test]
    fn close_call_is_desperate() {
        let mut heroes = vec![hero("Aria", 100, 20, 10, 15)];
        heroes[0].health = 15;
        let result = CombatOrchestrator::default()
            .run(&heroes, &[monster("Rat", 20, 6, 4, 5)], ScriptedRandom::constant(0.5))
            .unwrap();
        assert_eq!(CombatNarrator::default().classify(&result), CombatIntensity::Desperate);
    }

    #[test]
    fn narration_picks_from_pools() {
        let result = quick_win();
        let mut rng = ScriptedRandom::new(vec![0.0, 0.99]);
        let narration = CombatNarrator::default().narrate(&result, &mut rng);
        assert_eq!(narration.opening, ROUTINE_OPENINGS[0]);
        assert_eq!(narration.closing, VICTORY_CLOSINGS[2]);
        assert_eq!(
            narration.highlight.as_deref(),
            Some("The hardest blow: Aria attacks Rat for 18 damage!")
        );
        assert!(narration.to_string().starts_with(ROUTINE_OPENINGS[0]));
        assert_eq!(rng.consumed(), 2);
    }
}
