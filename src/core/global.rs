//! Engine state shared between allocating threads and the monitor.

use std::time::{Duration, Instant};

use crate::allocators::Tiers;
use crate::api::stats::{AllocStats, StatsTracker};
use crate::api::tier::Tier;
use crate::core::log_sink::LogSink;
use crate::policy::{Advance, PlacementPolicy};

/// What the monitor should do after a wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    Continue,
    Finished,
}

/// Everything the policy engine needs once it is running.
///
/// Built completely by `TierAlloc::start()` before it is published, then
/// shared with the monitor thread through an `Arc`. Only the statistics and
/// the policy's own atomics change afterwards.
pub(crate) struct EngineState {
    tiers: Tiers,
    policy: PlacementPolicy,
    stats: StatsTracker,
    started_at: Instant,
}

impl EngineState {
    pub fn new(tiers: Tiers, policy: PlacementPolicy) -> Self {
        Self {
            tiers,
            policy,
            stats: StatsTracker::new(),
            started_at: Instant::now(),
        }
    }

    pub fn tiers(&self) -> &Tiers {
        &self.tiers
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    pub fn stats(&self) -> AllocStats {
        self.stats.snapshot()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Tier for a new allocation. Without a durable tier every policy
    /// collapses to volatile.
    #[inline]
    pub fn select_tier(&self) -> Tier {
        if self.tiers.durable_available() {
            self.policy.select_tier()
        } else {
            Tier::Volatile
        }
    }

    pub fn allocate(&self, size: usize) -> *mut u8 {
        let tier = self.select_tier();
        let ptr = self.tiers.backend(tier).allocate(size);
        if !ptr.is_null() {
            self.stats.record_alloc(tier, size as u64);
        }
        ptr
    }

    pub fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        let Some(bytes) = count.checked_mul(size) else {
            return std::ptr::null_mut();
        };
        let tier = self.select_tier();
        let ptr = self.tiers.backend(tier).allocate_zeroed(count, size);
        if !ptr.is_null() {
            self.stats.record_alloc(tier, bytes as u64);
        }
        ptr
    }

    /// Resize on the tier that owns `ptr`; never migrates.
    ///
    /// A zero-size resize that returns null has released `ptr` (both tiers
    /// follow the glibc `realloc` convention) and is counted as a release.
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null and live.
    pub unsafe fn resize(&self, ptr: *mut u8, size: usize, record: bool) -> *mut u8 {
        let tier = self.tiers.identify(ptr);
        let out = self.tiers.backend(tier).resize(ptr, size);
        if record {
            if !out.is_null() {
                self.stats.record_resize(size as u64);
            } else if size == 0 {
                self.stats.record_release();
            }
        }
        out
    }

    /// # Safety
    ///
    /// `ptr` must be non-null and live.
    pub unsafe fn release(&self, ptr: *mut u8, record: bool) {
        let tier = self.tiers.identify(ptr);
        self.tiers.backend(tier).release(ptr);
        if record {
            self.stats.record_release();
        }
    }

    /// One monitor wake-up.
    ///
    /// Statistics are snapshotted under the lock; the log line is written
    /// after it is released.
    pub fn tick(&self, sink: &mut LogSink) -> Tick {
        match self.policy.schedule() {
            None => {
                let closed = self.stats.close_window();
                sink.window(self.elapsed(), &closed);
                Tick::Continue
            }
            Some(schedule) => match schedule.advance(&self.stats) {
                Advance::Pending => Tick::Continue,
                Advance::Switched { from, to, closed } => {
                    sink.transition(self.elapsed(), from, to, &closed);
                    Tick::Continue
                }
                Advance::Completed { tier, closed } => {
                    sink.completed(self.elapsed(), tier, &closed);
                    Tick::Finished
                }
                Advance::Exhausted => Tick::Finished,
            },
        }
    }
}
