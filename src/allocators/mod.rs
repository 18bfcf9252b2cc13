//! Tier back-ends and the adapter that routes between them.
//!
//! The engine never records which tier a pointer came from. Ownership is
//! answered by the back-ends themselves through [`TierBackend::owns`], and
//! [`Tiers::identify`] asks the durable tier first because the volatile tier
//! claims everything.

pub mod durable;
pub mod volatile;

use crate::api::tier::Tier;

pub use durable::DurableTier;
pub use volatile::VolatileTier;

/// Uniform operations over one memory tier.
///
/// Implementations must be callable from any thread, and must report
/// failure as a null pointer rather than panicking: these calls sit
/// underneath `malloc`.
pub trait TierBackend: Send + Sync {
    /// Which tier this back-end serves.
    fn tier(&self) -> Tier;

    /// Allocate `size` bytes, 16-byte aligned.
    fn allocate(&self, size: usize) -> *mut u8;

    /// Allocate `count * size` zero-filled bytes; null on overflow.
    fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8;

    /// Resize in place or by moving, always within this tier.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live, non-null pointer owned by this back-end.
    unsafe fn resize(&self, ptr: *mut u8, size: usize) -> *mut u8;

    /// Return memory to this tier.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live, non-null pointer owned by this back-end.
    unsafe fn release(&self, ptr: *mut u8);

    /// Whether `ptr` lies in memory managed by this back-end.
    fn owns(&self, ptr: *const u8) -> bool;
}

/// Both tiers, owned for the lifetime of the engine.
pub struct Tiers {
    volatile: VolatileTier,
    durable: Option<DurableTier>,
}

impl Tiers {
    /// Volatile only; the durable tier is permanently unavailable.
    pub fn volatile_only() -> Self {
        Self {
            volatile: VolatileTier::new(),
            durable: None,
        }
    }

    pub fn with_durable(durable: DurableTier) -> Self {
        Self {
            volatile: VolatileTier::new(),
            durable: Some(durable),
        }
    }

    #[inline]
    pub fn durable_available(&self) -> bool {
        self.durable.is_some()
    }

    pub fn durable(&self) -> Option<&DurableTier> {
        self.durable.as_ref()
    }

    /// Which tier owns `ptr`.
    #[inline]
    pub fn identify(&self, ptr: *const u8) -> Tier {
        match &self.durable {
            Some(d) if d.owns(ptr) => Tier::Durable,
            _ => Tier::Volatile,
        }
    }

    /// Back-end for `tier`, falling back to volatile when durable is unavailable.
    #[inline]
    pub fn backend(&self, tier: Tier) -> &dyn TierBackend {
        match (tier, &self.durable) {
            (Tier::Durable, Some(d)) => d,
            _ => &self.volatile,
        }
    }
}

impl std::fmt::Debug for Tiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tiers")
            .field("durable", &self.durable)
            .finish()
    }
}
