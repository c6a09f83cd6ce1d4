//! Parallel batch simulation.
//!
//! Runs many independent combats between the same two rosters, each with its
//! own [`SeededRandom`] seeded from `base_seed + index`. Combats share nothing,
//! so they run on the rayon pool and the report is identical for any thread
//! count: results are collected in index order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entity::{HeroRecord, MonsterRecord};
use crate::error::CombatError;
use crate::orchestrator::CombatOrchestrator;
use crate::random::SeededRandom;
use crate::state::CombatOutcome;

/// Condensed result of one combat in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Seed the combat ran with.
    pub seed: u64,
    /// How it ended.
    pub outcome: CombatOutcome,
    /// Loop iterations resolved.
    pub turns: u32,
    /// Experience earned.
    pub experience: u32,
}

/// Aggregate statistics of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Per-combat results in seed order.
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Number of combats run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no combat was run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of combats that ended with `outcome`.
    #[must_use]
    pub fn count(&self, outcome: CombatOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    /// Fraction of combats the heroes won.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn win_rate(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.count(CombatOutcome::HeroVictory) as f64 / self.entries.len() as f64
    }

    /// Mean turn count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_turns(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: u64 = self.entries.iter().map(|e| u64::from(e.turns)).sum();
        total as f64 / self.entries.len() as f64
    }

    /// Total experience across all combats.
    #[must_use]
    pub fn total_experience(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.experience)).sum()
    }
}

impl CombatOrchestrator {
    /// Runs `count` seeded combats in parallel.
    ///
    /// # Errors
    ///
    /// Fails on an empty side or invalid records.
    pub fn simulate_batch(
        &self,
        heroes: &[HeroRecord],
        monsters: &[MonsterRecord],
        base_seed: u64,
        count: usize,
    ) -> Result<BatchReport, CombatError> {
        // Surface record errors once instead of from every worker.
        self.session(heroes, monsters, SeededRandom::new(base_seed))?;

        let entries = (0..count as u64)
            .into_par_iter()
            .map(|index| {
                let seed = base_seed.wrapping_add(index);
                let result = self.run(heroes, monsters, SeededRandom::new(seed))?;
                Ok::<_, CombatError>(BatchEntry {
                    seed,
                    outcome: result.outcome,
                    turns: result.turn_count,
                    experience: result.experience_gained,
                })
            })
            .collect::<Result<Vec<_>, CombatError>>()?;

        let report = BatchReport { entries };
        info!(
            combats = report.len(),
            win_rate = report.win_rate(),
            average_turns = report.average_turns(),
            "batch finished"
        );
        Ok(report)
    }
}
