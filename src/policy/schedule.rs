//! Schedule-driven placement.
//!
//! A schedule file is plain text: the switch count, then one byte-volume
//! threshold per token. Segment `i` places on the durable tier when `i` is
//! even and on the volatile tier when it is odd; a segment ends once the
//! byte window has reached its threshold.
//!
//! ```text
//! 3
//! 1048576
//! 65536
//! 2097152
//! ```
//!
//! Only the monitor thread moves the cursor. Allocating threads read the
//! active tier with a relaxed load and may act on a decision that is one
//! polling interval stale.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::api::error::{Result, TierError};
use crate::api::stats::{AllocStats, StatsTracker};
use crate::api::tier::Tier;

/// Most thresholds read from a schedule; later tokens are ignored.
pub const MAX_THRESHOLDS: usize = 100;

/// A parsed placement plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    switches: usize,
    thresholds: Vec<u64>,
}

impl Schedule {
    pub fn new(switches: usize, thresholds: Vec<u64>) -> Self {
        Self {
            switches,
            thresholds,
        }
    }

    /// Read and parse a schedule file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| TierError::ScheduleIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse whitespace-separated schedule text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_ascii_whitespace();

        let first = tokens.next().ok_or(TierError::MissingSwitchCount)?;
        let switches = first
            .parse::<usize>()
            .map_err(|_| TierError::InvalidSwitchCount(first.to_string()))?;

        let thresholds = tokens
            .take(MAX_THRESHOLDS)
            .enumerate()
            .map(|(index, token)| {
                token.parse::<u64>().map_err(|_| TierError::InvalidThreshold {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(switches, thresholds))
    }

    /// Number of tier transitions the plan asks for.
    pub fn switches(&self) -> usize {
        self.switches
    }

    /// Every threshold read from the plan.
    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    /// Thresholds that will actually be honoured.
    pub fn segments(&self) -> &[u64] {
        let n = self.switches.min(self.thresholds.len());
        &self.thresholds[..n]
    }

    /// The switch count asks for more segments than the plan lists.
    pub fn is_truncated(&self) -> bool {
        self.switches > self.thresholds.len()
    }

    /// Initial cursor and tier.
    ///
    /// An empty plan stays on durable forever. A leading zero threshold
    /// means the durable segment is empty, so the plan starts in segment 1
    /// on the volatile tier.
    pub fn starting_point(&self) -> (usize, Tier) {
        match self.segments().first() {
            Some(0) => (1, segment_tier(1)),
            _ => (0, segment_tier(0)),
        }
    }
}

/// Tier a segment places on.
#[inline]
pub const fn segment_tier(index: usize) -> Tier {
    if index % 2 == 0 {
        Tier::Durable
    } else {
        Tier::Volatile
    }
}

/// Result of one monitor wake-up against the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The current segment's threshold has not been reached.
    Pending,
    /// A segment ended and placement moved to the next one.
    Switched {
        from: Tier,
        to: Tier,
        closed: AllocStats,
    },
    /// The final segment ended; placement stays on `tier` from now on.
    Completed { tier: Tier, closed: AllocStats },
    /// Nothing left to do.
    Exhausted,
}

/// Progress through a schedule, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleProgress {
    /// Index of the current segment.
    pub cursor: usize,
    /// Segments in the plan.
    pub segments: usize,
    /// Tier new allocations go to.
    pub active: Tier,
}

impl ScheduleProgress {
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.segments
    }
}

/// Runtime state of a schedule: the cursor and the active tier.
pub struct ScheduleState {
    segments: Vec<u64>,
    cursor: AtomicUsize,
    active: AtomicU8,
}

impl ScheduleState {
    pub fn new(schedule: &Schedule) -> Self {
        let (cursor, active) = schedule.starting_point();
        Self {
            segments: schedule.segments().to_vec(),
            cursor: AtomicUsize::new(cursor),
            active: AtomicU8::new(active as u8),
        }
    }

    #[inline]
    pub fn active_tier(&self) -> Tier {
        Tier::from_u8(self.active.load(Ordering::Relaxed))
    }

    pub fn progress(&self) -> ScheduleProgress {
        ScheduleProgress {
            cursor: self.cursor.load(Ordering::Relaxed),
            segments: self.segments.len(),
            active: self.active_tier(),
        }
    }

    /// Check the current segment against the byte window and move on if
    /// it is complete. Called from the monitor thread only.
    pub(crate) fn advance(&self, stats: &StatsTracker) -> Advance {
        let cursor = self.cursor.load(Ordering::Relaxed);
        let Some(&threshold) = self.segments.get(cursor) else {
            return Advance::Exhausted;
        };
        let Some(closed) = stats.close_window_at(threshold) else {
            return Advance::Pending;
        };

        let next = cursor + 1;
        self.cursor.store(next, Ordering::Relaxed);
        if next < self.segments.len() {
            let from = self.active_tier();
            let to = segment_tier(next);
            self.active.store(to as u8, Ordering::Relaxed);
            Advance::Switched { from, to, closed }
        } else {
            Advance::Completed {
                tier: self.active_tier(),
                closed,
            }
        }
    }
}
