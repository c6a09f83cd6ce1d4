//! Continuous-time initiative scheduler.
//!
//! Every living combatant holds a `next_action_time` on a shared combat
//! clock. The combatant with the smallest time acts next, the clock jumps to
//! that time, and the combatant is rescheduled one speed-derived delay later.
//! Faster combatants have shorter delays and therefore act more often.
//!
//! Ties are broken by queue order (the queue is stably sorted), never by
//! randomness, so initiative is fully deterministic.
//!
//! # Example
//!
//! ```
//! use skirmish_core::combatant::CombatantId;
//! use skirmish_core::config::InitiativeConfig;
//! use skirmish_core::scheduler::InitiativeScheduler;
//!
//! let mut scheduler = InitiativeScheduler::new(InitiativeConfig::default());
//! let fast = CombatantId::new(0);
//! let slow = CombatantId::new(1);
//! scheduler.initialize([(fast, 30), (slow, 0)]);
//!
//! let alive = |_: CombatantId| true;
//! assert_eq!(scheduler.next_actor(alive), Some(fast)); // t = 10
//! assert_eq!(scheduler.current_time(), 10);
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::combatant::CombatantId;
use crate::config::InitiativeConfig;

/// One queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Scheduled combatant.
    pub combatant: CombatantId,
    /// Speed used to compute the delay.
    pub speed: u32,
    /// Clock time of the combatant's next action.
    pub next_action_time: u64,
}

/// Speed-weighted action queue and combat clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitiativeScheduler {
    config: InitiativeConfig,
    queue: Vec<ScheduleEntry>,
    current_time: u64,
}

impl InitiativeScheduler {
    /// Creates an empty scheduler at time 0.
    #[must_use]
    pub fn new(config: InitiativeConfig) -> Self {
        Self {
            config,
            queue: Vec::new(),
            current_time: 0,
        }
    }

    /// Clock units a combatant with `speed` waits between actions.
    #[must_use]
    pub fn delay_for(&self, speed: u32) -> u64 {
        self.config.delay_for(speed)
    }

    /// Schedules every `(combatant, speed)` pair for its first action.
    ///
    /// Replaces any existing queue. The first action of each combatant is
    /// one delay after the current clock time.
    pub fn initialize(&mut self, combatants: impl IntoIterator<Item = (CombatantId, u32)>) {
        let now = self.current_time;
        self.queue = combatants
            .into_iter()
            .map(|(combatant, speed)| ScheduleEntry {
                combatant,
                speed,
                next_action_time: now + self.config.delay_for(speed),
            })
            .collect();
        self.queue.sort_by_key(|e| e.next_action_time);
    }

    /// Returns the next combatant to act and advances the clock.
    ///
    /// Entries for which `is_active` returns false (dead or fled combatants)
    /// are dropped first. Returns `None` when nobody is left.
    ///
    /// Ties go to queue order. The actor is rescheduled in place before the
    /// stable sort, so when it lands on the same time as an entry behind it,
    /// the combatant that just acted goes first.
    pub fn next_actor(&mut self, is_active: impl Fn(CombatantId) -> bool) -> Option<CombatantId> {
        self.queue.retain(|e| is_active(e.combatant));
        let first = self.queue.first_mut()?;

        self.current_time = first.next_action_time;
        first.next_action_time = self.current_time + self.config.delay_for(first.speed);
        let actor = first.combatant;

        // Stable: equal times keep their queue order.
        self.queue.sort_by_key(|e| e.next_action_time);

        trace!(actor = %actor, time = self.current_time, "initiative pick");
        Some(actor)
    }

    /// Current combat clock.
    #[must_use]
    pub const fn current_time(&self) -> u64 {
        self.current_time
    }

    /// Queue entries in action order.
    #[must_use]
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.queue
    }

    /// Returns true when nobody is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Clears the queue and rewinds the clock for a fresh combat.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.current_time = 0;
    }
}
