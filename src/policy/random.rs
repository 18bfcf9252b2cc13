//! Coin-flip placement.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::tier::Tier;
use crate::sync::atomics::AtomicCounter;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Independent 50/50 tier choice per call.
///
/// A SplitMix64 stream over an atomic state: each call claims the next
/// state with one `fetch_add`, so the generator is lock-free and never
/// allocates.
pub struct RandomPlacement {
    state: AtomicCounter,
}

impl RandomPlacement {
    pub const fn new(seed: u64) -> Self {
        Self {
            state: AtomicCounter::new(seed),
        }
    }

    /// A seed that differs between runs and between processes.
    pub fn entropy_seed() -> u64 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        nanos ^ (u64::from(std::process::id()) << 32)
    }

    #[inline]
    pub fn select_tier(&self) -> Tier {
        let x = splitmix64(self.state.advance(GOLDEN_GAMMA));
        if x >> 63 == 0 {
            Tier::Volatile
        } else {
            Tier::Durable
        }
    }
}

#[inline]
fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
