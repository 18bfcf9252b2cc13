//! Atomic helpers for policy counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// An atomic counter that hands out every value exactly once.
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create a new counter.
    pub const fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    /// Return the current value and advance by one.
    ///
    /// Concurrent callers each observe a distinct value.
    #[inline]
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Return the current value and advance by `step`, wrapping on overflow.
    #[inline]
    pub fn advance(&self, step: u64) -> u64 {
        self.0.fetch_add(step, Ordering::Relaxed)
    }

    /// Get the current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_returns_previous() {
        let c = AtomicCounter::new(3);
        assert_eq!(c.next(), 3);
        assert_eq!(c.next(), 4);
        assert_eq!(c.get(), 5);
    }

    #[test]
    fn test_advance_wraps() {
        let c = AtomicCounter::new(u64::MAX);
        assert_eq!(c.advance(2), u64::MAX);
        assert_eq!(c.get(), 1);
    }
}
