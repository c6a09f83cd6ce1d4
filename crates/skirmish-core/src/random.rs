//! Pluggable uniform random sources.
//!
//! Every random decision in a combat (damage variance, critical rolls, flee
//! chances, AI dice, target jitter) is drawn from a [`RandomSource`]. The
//! engine never touches a global RNG, so a combat is fully reproducible from
//! its source.
//!
//! Three sources are provided:
//! - [`SystemRandom`]: entropy-seeded, for production play
//! - [`SeededRandom`]: `ChaCha8`-backed, reproducible from a `u64` seed
//! - [`ScriptedRandom`]: replays a fixed sequence of values for tests
//!
//! # Example
//!
//! ```
//! use skirmish_core::random::{RandomSource, ScriptedRandom};
//!
//! let mut rng = ScriptedRandom::new(vec![0.25, 0.75]);
//! assert_eq!(rng.next_uniform(), 0.25);
//! assert_eq!(rng.next_uniform(), 0.75);
//! assert!(rng.try_next().is_err());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::RandomError;

// =============================================================================
// RandomSource
// =============================================================================

/// A source of uniform random numbers in `[0, 1)`.
///
/// Implementations must be exclusively owned by one combat at a time.
/// The trait is object-safe so the engine can take `&mut dyn RandomSource`.
pub trait RandomSource {
    /// Returns the next uniform value in `[0, 1)`.
    fn next_uniform(&mut self) -> f64;

    /// Returns `true` with the given probability.
    ///
    /// Consumes exactly one value. A roll succeeds when the drawn value is
    /// strictly below `probability`.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_uniform() < probability
    }

    /// Returns a value uniformly distributed in `[low, high)`.
    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_uniform() * (high - low)
    }

    /// Picks an index in `0..len`. Returns 0 when `len` is 0.
    fn pick_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let idx = (self.next_uniform() * len as f64) as usize;
        idx.min(len - 1)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

// =============================================================================
// System source
// =============================================================================

/// Entropy-seeded production source.
#[derive(Debug, Clone)]
pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    /// Creates a source seeded from operating system entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

// =============================================================================
// Seeded source
// =============================================================================

/// Deterministic source backed by `ChaCha8`.
///
/// Two sources created with the same seed yield identical sequences on every
/// platform, which is what batch simulation relies on.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRandom {
    /// Creates a source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed this source was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewinds the source to the start of its sequence.
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

impl RandomSource for SeededRandom {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

// =============================================================================
// Scripted source
// =============================================================================

/// What a [`ScriptedRandom`] does once its script runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exhaustion {
    /// Panic on the next draw.
    Fail,
    /// Keep returning the given value.
    Fallback(f64),
    /// Start over from the beginning of the script.
    Cycle,
}

/// Replays a fixed sequence of values.
///
/// By default an exhausted script panics on the next draw. Use
/// [`ScriptedRandom::with_exhaustion`] to opt into a fallback value or cycling.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
    exhaustion: Exhaustion,
}

impl ScriptedRandom {
    /// Creates a strict script that fails once exhausted.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            cursor: 0,
            exhaustion: Exhaustion::Fail,
        }
    }

    /// Creates a source that always returns `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            values: Vec::new(),
            cursor: 0,
            exhaustion: Exhaustion::Fallback(value),
        }
    }

    /// Sets the exhaustion behaviour.
    #[must_use]
    pub fn with_exhaustion(mut self, exhaustion: Exhaustion) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// Number of scripted values consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Number of scripted values left before exhaustion.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.cursor)
    }

    /// Draws the next value without panicking.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::Exhausted`] when the script is used up and the
    /// exhaustion mode is [`Exhaustion::Fail`], and
    /// [`RandomError::OutOfRange`] when a scripted value lies outside `[0, 1)`.
    pub fn try_next(&mut self) -> Result<f64, RandomError> {
        let value = if let Some(v) = self.values.get(self.cursor) {
            self.cursor += 1;
            *v
        } else {
            match self.exhaustion {
                Exhaustion::Fail => {
                    return Err(RandomError::Exhausted {
                        consumed: self.cursor,
                    })
                }
                Exhaustion::Fallback(v) => v,
                Exhaustion::Cycle if !self.values.is_empty() => {
                    self.cursor = 1;
                    self.values[0]
                }
                Exhaustion::Cycle => {
                    return Err(RandomError::Exhausted {
                        consumed: self.cursor,
                    })
                }
            }
        };

        if (0.0..1.0).contains(&value) {
            Ok(value)
        } else {
            Err(RandomError::OutOfRange { value })
        }
    }
}

impl RandomSource for ScriptedRandom {
    /// # Panics
    ///
    /// Panics when the script is exhausted in [`Exhaustion::Fail`] mode or a
    /// scripted value is outside `[0, 1)`.
    fn next_uniform(&mut self) -> f64 {
        match self.try_next() {
            Ok(v) => v,
            Err(err) => panic!("scripted random source failed: {err}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod scripted_tests {
        use super::*;

        #[test]
        fn replays_in_order() {
            let mut rng = ScriptedRandom::new(vec![0.1, 0.2, 0.3]);
            assert_eq!(rng.next_uniform(), 0.1);
            assert_eq!(rng.next_uniform(), 0.2);
            assert_eq!(rng.next_uniform(), 0.3);
            assert_eq!(rng.consumed(), 3);
            assert_eq!(rng.remaining(), 0);
        }

        #[test]
        fn strict_script_reports_exhaustion() {
            let mut rng = ScriptedRandom::new(vec![0.5]);
            rng.next_uniform();
            assert_eq!(rng.try_next(), Err(RandomError::Exhausted { consumed: 1 }));
        }

        #[test]
        #[should_panic(expected = "exhausted")]
        fn strict_script_panics_when_drawn_past_end() {
            let mut rng = ScriptedRandom::new(vec![]);
            rng.next_uniform();
        }

        #[test]
        fn fallback_mode_repeats_value() {
            let mut rng =
                ScriptedRandom::new(vec![0.9]).with_exhaustion(Exhaustion::Fallback(0.5));
            assert_eq!(rng.next_uniform(), 0.9);
            assert_eq!(rng.next_uniform(), 0.5);
            assert_eq!(rng.next_uniform(), 0.5);
        }

        #[test]
        fn cycle_mode_wraps_around() {
            let mut rng = ScriptedRandom::new(vec![0.1, 0.2]).with_exhaustion(Exhaustion::Cycle);
            let drawn: Vec<f64> = (0..5).map(|_| rng.next_uniform()).collect();
            assert_eq!(drawn, vec![0.1, 0.2, 0.1, 0.2, 0.1]);
        }

        #[test]
        fn constant_never_exhausts() {
            let mut rng = ScriptedRandom::constant(0.5);
            for _ in 0..100 {
                assert_eq!(rng.next_uniform(), 0.5);
            }
        }

        #[test]
        fn out_of_range_value_is_rejected() {
            let mut rng = ScriptedRandom::new(vec![1.0]);
            assert_eq!(rng.try_next(), Err(RandomError::OutOfRange { value: 1.0 }));
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn chance_is_strictly_below() {
            let mut rng = ScriptedRandom::new(vec![0.1, 0.09]);
            assert!(!rng.chance(0.1));
            assert!(rng.chance(0.1));
        }

        #[test]
        fn range_scales_value() {
            let mut rng = ScriptedRandom::constant(0.5);
            assert!((rng.range(0.8, 1.2) - 1.0).abs() < 1e-12);
        }

        #[test]
        fn pick_index_stays_in_bounds() {
            let mut rng = ScriptedRandom::new(vec![0.0, 0.999_999, 0.5]);
            assert_eq!(rng.pick_index(4), 0);
            assert_eq!(rng.pick_index(4), 3);
            assert_eq!(rng.pick_index(4), 2);
            assert_eq!(rng.pick_index(0), 0);
        }

        #[test]
        fn trait_object_forwarding() {
            let mut inner = ScriptedRandom::new(vec![0.3]);
            let rng: &mut dyn RandomSource = &mut inner;
            assert_eq!(rng.next_uniform(), 0.3);
        }
    }

    mod seeded_tests {
        use super::*;

        #[test]
        fn same_seed_same_sequence() {
            let mut a = SeededRandom::new(42);
            let mut b = SeededRandom::new(42);
            for _ in 0..32 {
                assert_eq!(a.next_uniform(), b.next_uniform());
            }
        }

        #[test]
        fn reset_rewinds() {
            let mut rng = SeededRandom::new(7);
            let first = rng.next_uniform();
            rng.next_uniform();
            rng.reset();
            assert_eq!(rng.next_uniform(), first);
            assert_eq!(rng.seed(), 7);
        }

        #[test]
        fn values_in_unit_interval() {
            let mut rng = SystemRandom::new();
            for _ in 0..1000 {
                let v = rng.next_uniform();
                assert!((0.0..1.0).contains(&v));
            }
        }
    }
}
