//! Error types for the combat engine.
//!
//! Recoverable failures are reported through these enums. Programming errors
//! (asking for a strategy that does not exist) panic at the call site instead.

use thiserror::Error;

/// Errors produced by scripted random sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RandomError {
    /// The script ran out of values and no fallback was configured.
    #[error("random script exhausted after {consumed} values")]
    Exhausted {
        /// How many values were drawn before exhaustion.
        consumed: usize,
    },

    /// A scripted value lies outside `[0, 1)`.
    #[error("random value {value} is outside [0, 1)")]
    OutOfRange {
        /// The offending value.
        value: f64,
    },
}

/// Errors raised while loading or validating a [`CombatConfig`](crate::config::CombatConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("failed to parse combat config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A probability lies outside `[0, 1]`.
    #[error("`{field}` must be a probability in [0, 1], got {value}")]
    InvalidProbability {
        /// Dotted path of the field.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A value that must be strictly positive is zero.
    #[error("`{field}` must be greater than zero")]
    ZeroValue {
        /// Dotted path of the field.
        field: &'static str,
    },

    /// A lower bound exceeds its upper bound.
    #[error("`{field}` range is inverted: {low} > {high}")]
    InvertedRange {
        /// Dotted path of the field.
        field: &'static str,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

/// Errors raised when a combat cannot be set up.
#[derive(Debug, Error)]
pub enum CombatError {
    /// One side has no combatants.
    #[error("the {side} side has no combatants")]
    EmptyTeam {
        /// Which side was empty.
        side: &'static str,
    },

    /// A record carries impossible vital stats.
    #[error("invalid combatant `{name}`: {reason}")]
    InvalidCombatant {
        /// Display name of the record.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The supplied configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
