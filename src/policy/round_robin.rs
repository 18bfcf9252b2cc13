//! Alternate tiers call by call.

use crate::api::tier::Tier;
use crate::sync::atomics::AtomicCounter;

/// Per-call alternation driven by one shared counter.
///
/// Even counter values place on the durable tier, odd ones on volatile.
/// The counter is atomic, so concurrent callers each consume a distinct
/// value and the assignment never skips or repeats.
#[derive(Default)]
pub struct RoundRobin {
    counter: AtomicCounter,
}

impl RoundRobin {
    pub const fn new() -> Self {
        Self {
            counter: AtomicCounter::new(0),
        }
    }

    #[inline]
    pub fn select_tier(&self) -> Tier {
        self.next_slot().1
    }

    /// Consume one counter value and return it with the tier it maps to.
    #[inline]
    pub fn next_slot(&self) -> (u64, Tier) {
        let n = self.counter.next();
        let tier = if n % 2 == 0 { Tier::Durable } else { Tier::Volatile };
        (n, tier)
    }

    /// Counter values handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.get()
    }
}
