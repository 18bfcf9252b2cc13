//! Process lifecycle state machine.
//!
//! ```text
//! Uninitialized -> Initializing -> Ready -> ShuttingDown -> Stopped
//! ```
//!
//! Only `Ready` lets the policy engine see allocations. Every other state
//! routes new allocations to the volatile tier, which is what makes the
//! allocations performed by `start()` itself safe.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where a [`TierAlloc`](crate::TierAlloc) is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Constructed, `start()` not yet called.
    Uninitialized = 0,
    /// `start()` is establishing tiers, schedule and monitor thread.
    Initializing = 1,
    /// Policy engine active.
    Ready = 2,
    /// `stop()` is joining the monitor thread.
    ShuttingDown = 3,
    /// Terminal.
    Stopped = 4,
}

impl LifecycleState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting down",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Atomic cell holding a [`LifecycleState`].
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub const fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Uninitialized as u8))
    }

    #[inline]
    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire) == LifecycleState::Ready as u8
    }

    /// Move from `from` to `to`; on mismatch returns the state actually observed.
    pub fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }

    pub fn set(&self, state: LifecycleState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let lc = Lifecycle::new();
        assert_eq!(lc.get(), LifecycleState::Uninitialized);
        lc.transition(LifecycleState::Uninitialized, LifecycleState::Initializing)
            .unwrap();
        assert!(!lc.is_ready());
        lc.set(LifecycleState::Ready);
        assert!(lc.is_ready());
    }

    #[test]
    fn test_transition_reports_observed_state() {
        let lc = Lifecycle::new();
        lc.set(LifecycleState::Stopped);
        let err = lc
            .transition(LifecycleState::Ready, LifecycleState::ShuttingDown)
            .unwrap_err();
        assert_eq!(err, LifecycleState::Stopped);
    }
}
