//! # Skirmish Core
//!
//! Turn-based combat resolution engine for Skirmish.
//!
//! This crate resolves a fight between a party of heroes and a group of
//! monsters, one action at a time, until one side wins, a hero escapes or
//! the turn ceiling is reached. Every resolved action is recorded with a full
//! snapshot of the field, so a combat can be replayed or rendered later.
//!
//! ## Architecture
//!
//! - **Scheduling**: a continuous-time initiative queue driven by speed
//! - **Status effects**: stacking, expiring effects with a global tick grid
//! - **Strategies**: attack, defend, flee and poison as a closed enum
//! - **AI**: rule-based action and target selection
//! - **Orchestration**: the loop tying it together, steppable or one-shot
//!
//! All randomness flows through [`random::RandomSource`], so a combat is
//! reproducible from its source.
//!
//! ## Usage
//!
//! ```
//! use skirmish_core::{CombatOrchestrator, HeroRecord, MonsterRecord, SeededRandom};
//!
//! let orchestrator = CombatOrchestrator::default();
//! let result = orchestrator
//!     .run(
//!         &[HeroRecord::new("Aria", 100, 20, 10, 15)],
//!         &[MonsterRecord::new("Goblin", 30, 8, 2, 12)],
//!         SeededRandom::new(42),
//!     )
//!     .unwrap();
//!
//! println!("{}", result.summary);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod ai;
pub mod batch;
pub mod combatant;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod narrator;
pub mod orchestrator;
pub mod random;
pub mod scheduler;
pub mod state;
pub mod status;

pub use batch::BatchReport;
pub use config::CombatConfig;
pub use entity::{HeroRecord, MonsterRecord};
pub use error::{CombatError, ConfigError, RandomError};
pub use orchestrator::{CombatOrchestrator, CombatPhase, CombatResult, CombatSession};
pub use random::{RandomSource, ScriptedRandom, SeededRandom, SystemRandom};
pub use state::{Combat, CombatOutcome, CombatTurn};

#[cfg(test)]
mod tests;
