//! Allocation statistics.

use crate::api::tier::Tier;
use crate::sync::mutex::Mutex;
use crate::util::size::format_bytes;

/// Snapshot of the allocation statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Bytes requested since the current window opened.
    pub bytes_in_window: u64,

    /// Objects allocated minus objects released.
    ///
    /// Signed: releases of objects allocated before monitoring began can
    /// drive it below zero. Advisory only.
    pub live_objects: i64,

    /// Bytes requested since start, across all windows.
    pub total_bytes: u64,

    /// Successful `allocate`/`allocate_zeroed` calls.
    pub allocation_count: u64,

    /// Successful `resize` calls on non-null pointers.
    pub resize_count: u64,

    /// `release` calls on non-null pointers.
    pub release_count: u64,

    /// New allocations placed on the volatile tier.
    pub volatile_allocations: u64,

    /// New allocations placed on the durable tier.
    pub durable_allocations: u64,

    /// Windows closed by the monitor so far.
    pub windows_closed: u64,
}

impl AllocStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// New allocations placed on `tier`.
    pub fn allocations_on(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Volatile => self.volatile_allocations,
            Tier::Durable => self.durable_allocations,
        }
    }
}

impl std::fmt::Display for AllocStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Allocation Statistics:")?;
        writeln!(f, "  Window:          {}", format_bytes(self.bytes_in_window))?;
        writeln!(f, "  Total:           {}", format_bytes(self.total_bytes))?;
        writeln!(f, "  Live objects:    {}", self.live_objects)?;
        writeln!(f, "  Allocations:     {}", self.allocation_count)?;
        writeln!(f, "  Resizes:         {}", self.resize_count)?;
        writeln!(f, "  Releases:        {}", self.release_count)?;
        writeln!(f, "  Volatile:        {}", self.volatile_allocations)?;
        writeln!(f, "  Durable:         {}", self.durable_allocations)?;
        writeln!(f, "  Windows closed:  {}", self.windows_closed)?;
        Ok(())
    }
}

/// Shared statistics, every read and write under one mutex.
///
/// Critical sections are a handful of integer updates; nothing in here
/// allocates or performs I/O while the lock is held.
pub(crate) struct StatsTracker {
    inner: Mutex<AllocStats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(AllocStats::new()),
        }
    }

    pub fn record_alloc(&self, tier: Tier, bytes: u64) {
        let mut s = self.inner.lock();
        s.bytes_in_window = s.bytes_in_window.wrapping_add(bytes);
        s.total_bytes = s.total_bytes.wrapping_add(bytes);
        s.live_objects += 1;
        s.allocation_count += 1;
        match tier {
            Tier::Volatile => s.volatile_allocations += 1,
            Tier::Durable => s.durable_allocations += 1,
        }
    }

    /// A resize counts as a fresh allocation event for both bytes and
    /// live objects, even though the original allocation was already counted.
    pub fn record_resize(&self, bytes: u64) {
        let mut s = self.inner.lock();
        s.bytes_in_window = s.bytes_in_window.wrapping_add(bytes);
        s.total_bytes = s.total_bytes.wrapping_add(bytes);
        s.live_objects += 1;
        s.resize_count += 1;
    }

    pub fn record_release(&self) {
        let mut s = self.inner.lock();
        s.live_objects -= 1;
        s.release_count += 1;
    }

    pub fn snapshot(&self) -> AllocStats {
        *self.inner.lock()
    }

    /// Close the current window unconditionally.
    ///
    /// Returns the snapshot taken just before the byte window was reset.
    pub fn close_window(&self) -> AllocStats {
        let mut s = self.inner.lock();
        let closed = *s;
        s.bytes_in_window = 0;
        s.windows_closed += 1;
        closed
    }

    /// Close the current window only if it has reached `threshold` bytes.
    pub fn close_window_at(&self, threshold: u64) -> Option<AllocStats> {
        let mut s = self.inner.lock();
        if s.bytes_in_window < threshold {
            return None;
        }
        let closed = *s;
        s.bytes_in_window = 0;
        s.windows_closed += 1;
        Some(closed)
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
