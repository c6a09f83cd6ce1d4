//! Tunable combat constants.
//!
//! Every balance number the engine uses lives here. The defaults reproduce
//! the stock game rules; callers can override any subset from JSON because
//! every struct is `#[serde(default)]`.
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::CombatConfig;
//!
//! let config = CombatConfig::from_json_str(r#"{ "max_turns": 50 }"#).unwrap();
//! assert_eq!(config.max_turns, 50);
//! assert_eq!(config.tick_interval, 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// Top-level config
// =============================================================================

/// Configuration for one combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Global grid, in clock units, on which damage and healing over time land.
    pub tick_interval: u64,
    /// Turn ceiling after which the combat ends in a stalemate.
    pub max_turns: u32,
    /// Initiative delay formula.
    pub initiative: InitiativeConfig,
    /// Attack damage formula.
    pub attack: AttackConfig,
    /// Flee chance formula.
    pub flee: FleeConfig,
    /// Status effect durations, magnitudes and caps.
    pub effects: StatusEffectConfig,
    /// AI decision thresholds.
    pub ai: AiConfig,
    /// How experience is awarded for defeated monsters.
    pub experience: ExperiencePolicy,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            tick_interval: 100,
            max_turns: 500,
            initiative: InitiativeConfig::default(),
            attack: AttackConfig::default(),
            flee: FleeConfig::default(),
            effects: StatusEffectConfig::default(),
            ai: AiConfig::default(),
            experience: ExperiencePolicy::default(),
        }
    }
}

impl CombatConfig {
    /// Parses a configuration from JSON and validates it.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or any validation
    /// error from [`CombatConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval == 0 {
            return Err(ConfigError::ZeroValue {
                field: "tick_interval",
            });
        }
        if self.max_turns == 0 {
            return Err(ConfigError::ZeroValue { field: "max_turns" });
        }
        self.initiative.validate()?;
        self.attack.validate()?;
        self.flee.validate()?;
        self.effects.validate()?;
        self.ai.validate()
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

fn ordered(field: &'static str, low: f64, high: f64) -> Result<(), ConfigError> {
    if low <= high {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { field, low, high })
    }
}

// =============================================================================
// Initiative
// =============================================================================

/// Speed-to-delay formula: `max(min_delay, base_delay - speed * speed_factor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitiativeConfig {
    /// Delay of a speed-0 combatant.
    pub base_delay: u64,
    /// Delay removed per point of speed.
    pub speed_factor: u64,
    /// Floor that keeps every delay positive.
    pub min_delay: u64,
}

impl Default for InitiativeConfig {
    fn default() -> Self {
        Self {
            base_delay: 100,
            speed_factor: 3,
            min_delay: 10,
        }
    }
}

impl InitiativeConfig {
    /// Clock units a combatant with `speed` waits between actions.
    #[must_use]
    pub fn delay_for(&self, speed: u32) -> u64 {
        self.base_delay
            .saturating_sub(u64::from(speed) * self.speed_factor)
            .max(self.min_delay)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay == 0 {
            return Err(ConfigError::ZeroValue {
                field: "initiative.min_delay",
            });
        }
        Ok(())
    }
}

// =============================================================================
// Attack
// =============================================================================

/// Parameters of the basic attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Fraction of the target's defense subtracted from the attack stat.
    pub defense_factor: f64,
    /// Lower bound of the damage variance multiplier.
    pub variance_min: f64,
    /// Upper bound of the damage variance multiplier.
    pub variance_max: f64,
    /// Probability of a critical hit.
    pub crit_chance: f64,
    /// Damage multiplier on a critical hit.
    pub crit_multiplier: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            defense_factor: 0.5,
            variance_min: 0.8,
            variance_max: 1.2,
            crit_chance: 0.1,
            crit_multiplier: 1.5,
        }
    }
}

impl AttackConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        probability("attack.crit_chance", self.crit_chance)?;
        ordered("attack.variance", self.variance_min, self.variance_max)
    }
}

// =============================================================================
// Flee
// =============================================================================

/// Parameters of the flee attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleeConfig {
    /// Chance before any adjustment.
    pub base_chance: f64,
    /// Chance added per point the actor is faster than the target.
    pub per_speed_point: f64,
    /// Health fraction at or below which the desperation bonus applies.
    pub low_health_threshold: f64,
    /// Desperation bonus.
    pub low_health_bonus: f64,
    /// Floor of the final chance.
    pub min_chance: f64,
    /// Ceiling of the final chance.
    pub max_chance: f64,
}

impl Default for FleeConfig {
    fn default() -> Self {
        Self {
            base_chance: 0.7,
            per_speed_point: 0.02,
            low_health_threshold: 0.3,
            low_health_bonus: 0.2,
            min_chance: 0.1,
            max_chance: 0.95,
        }
    }
}

impl FleeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        probability("flee.base_chance", self.base_chance)?;
        probability("flee.min_chance", self.min_chance)?;
        probability("flee.max_chance", self.max_chance)?;
        ordered("flee.chance", self.min_chance, self.max_chance)
    }
}

// =============================================================================
// Status effects
// =============================================================================

/// Durations, magnitudes and caps for status effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusEffectConfig {
    /// Duration of the Defend stance.
    pub defend_duration: u64,
    /// Damage reduction granted by the Defend stance.
    pub defend_reduction: f64,
    /// Duration of one poison application.
    pub poison_duration: u64,
    /// Damage per tick added by one poison application.
    pub poison_damage: u32,
    /// Cap on the reduction carried by a single stacked effect.
    pub max_stacked_reduction: f64,
    /// Cap on the reduction summed across all active effects.
    pub max_total_reduction: f64,
}

impl Default for StatusEffectConfig {
    fn default() -> Self {
        Self {
            defend_duration: 300,
            defend_reduction: 0.4,
            poison_duration: 300,
            poison_damage: 5,
            max_stacked_reduction: 0.9,
            max_total_reduction: 0.8,
        }
    }
}

impl StatusEffectConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.defend_duration == 0 {
            return Err(ConfigError::ZeroValue {
                field: "effects.defend_duration",
            });
        }
        if self.poison_duration == 0 {
            return Err(ConfigError::ZeroValue {
                field: "effects.poison_duration",
            });
        }
        if self.poison_damage == 0 {
            return Err(ConfigError::ZeroValue {
                field: "effects.poison_damage",
            });
        }
        probability("effects.defend_reduction", self.defend_reduction)?;
        probability("effects.max_stacked_reduction", self.max_stacked_reduction)?;
        probability("effects.max_total_reduction", self.max_total_reduction)
    }
}

// =============================================================================
// AI
// =============================================================================

/// Thresholds and probabilities of the combat AI.
///
/// Health thresholds are fractions of max health, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Health fraction at or below which a hero considers fleeing.
    pub hero_flee_threshold: f64,
    /// Chance a hero in flee range actually flees.
    pub hero_flee_chance: f64,
    /// Hero "critical" health threshold for defending.
    pub hero_critical_threshold: f64,
    /// Hero defend chance at critical health.
    pub hero_critical_defend_chance: f64,
    /// Hero "wounded" health threshold for defending.
    pub hero_wounded_threshold: f64,
    /// Hero defend chance when wounded.
    pub hero_wounded_defend_chance: f64,
    /// Hero defend chance at any health.
    pub hero_baseline_defend_chance: f64,
    /// Monster "critical" health threshold for defending.
    pub monster_critical_threshold: f64,
    /// Monster defend chance at critical health.
    pub monster_critical_defend_chance: f64,
    /// Monster "wounded" health threshold for defending.
    pub monster_wounded_threshold: f64,
    /// Monster defend chance when wounded.
    pub monster_wounded_defend_chance: f64,
    /// Monster defend chance at any health.
    pub monster_baseline_defend_chance: f64,
    /// Poison chance on the first turn.
    pub poison_initial_chance: f64,
    /// Poison chance lost per elapsed turn.
    pub poison_decay_per_turn: f64,
    /// Floor of the decaying poison chance.
    pub poison_min_chance: f64,
    /// Extra poison chance when the target is already poisoned.
    pub poison_stack_bonus: f64,
    /// Lower bound of the target-score jitter.
    pub target_jitter_min: f64,
    /// Upper bound of the target-score jitter.
    pub target_jitter_max: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            hero_flee_threshold: 0.2,
            hero_flee_chance: 0.1,
            hero_critical_threshold: 0.3,
            hero_critical_defend_chance: 0.4,
            hero_wounded_threshold: 0.5,
            hero_wounded_defend_chance: 0.25,
            hero_baseline_defend_chance: 0.1,
            monster_critical_threshold: 0.25,
            monster_critical_defend_chance: 0.3,
            monster_wounded_threshold: 0.5,
            monster_wounded_defend_chance: 0.15,
            monster_baseline_defend_chance: 0.05,
            poison_initial_chance: 0.8,
            poison_decay_per_turn: 0.05,
            poison_min_chance: 0.25,
            poison_stack_bonus: 0.15,
            target_jitter_min: 0.9,
            target_jitter_max: 1.1,
        }
    }
}

impl AiConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("ai.hero_flee_threshold", self.hero_flee_threshold),
            ("ai.hero_flee_chance", self.hero_flee_chance),
            ("ai.hero_critical_threshold", self.hero_critical_threshold),
            ("ai.hero_critical_defend_chance", self.hero_critical_defend_chance),
            ("ai.hero_wounded_threshold", self.hero_wounded_threshold),
            ("ai.hero_wounded_defend_chance", self.hero_wounded_defend_chance),
            ("ai.hero_baseline_defend_chance", self.hero_baseline_defend_chance),
            ("ai.monster_critical_threshold", self.monster_critical_threshold),
            (
                "ai.monster_critical_defend_chance",
                self.monster_critical_defend_chance,
            ),
            ("ai.monster_wounded_threshold", self.monster_wounded_threshold),
            (
                "ai.monster_wounded_defend_chance",
                self.monster_wounded_defend_chance,
            ),
            (
                "ai.monster_baseline_defend_chance",
                self.monster_baseline_defend_chance,
            ),
            ("ai.poison_initial_chance", self.poison_initial_chance),
            ("ai.poison_decay_per_turn", self.poison_decay_per_turn),
            ("ai.poison_min_chance", self.poison_min_chance),
            ("ai.poison_stack_bonus", self.poison_stack_bonus),
        ];
        for (field, value) in probabilities {
            probability(field, value)?;
        }
        ordered("ai.target_jitter", self.target_jitter_min, self.target_jitter_max)
    }
}

// =============================================================================
// Experience
// =============================================================================

/// How experience is computed for each defeated monster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperiencePolicy {
    /// `floor((attack + defense + speed) * 2)` per defeated monster.
    #[default]
    StatFormula,
    /// The `experience_reward` carried by the monster record.
    RecordReward,
}
