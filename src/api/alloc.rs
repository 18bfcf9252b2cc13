//! The main allocator type.

use std::sync::{Arc, OnceLock};

use crate::allocators::{DurableTier, TierBackend, Tiers, VolatileTier};
use crate::api::config::TierConfig;
use crate::api::error::{Result, TierError};
use crate::api::lifecycle::{Lifecycle, LifecycleState};
use crate::api::stats::AllocStats;
use crate::api::tier::Tier;
use crate::core::global::EngineState;
use crate::core::log_sink::LogSink;
use crate::core::monitor::{self, MonitorHandle};
use crate::core::tls;
use crate::diagnostics::{self, TA001, TA002, TA201, TA202, TA301};
use crate::policy::{PlacementPolicy, PolicyKind, ScheduleProgress};
use crate::sync::mutex::Mutex;

/// The tiered allocator.
///
/// One value holds everything the interposer needs: both tiers, the
/// placement policy, the statistics and the monitor thread. It starts
/// inert; [`start`](Self::start) brings the policy engine up and
/// [`stop`](Self::stop) tears the monitor down. Outside the `Ready` state
/// new allocations go to the volatile tier, while `resize` and `release`
/// keep routing by ownership so pointers from the durable tier stay valid.
///
/// # Example
///
/// ```rust,no_run
/// use tieralloc::{Tier, TierAlloc, TierConfig};
///
/// let alloc = TierAlloc::new(
///     TierConfig::round_robin()
///         .with_durable_path("/mnt/pmem0")
///         .with_durable_capacity(64 << 20),
/// );
/// alloc.start().unwrap();
///
/// let p = alloc.allocate(128);
/// assert!(matches!(alloc.identify(p), Tier::Durable | Tier::Volatile));
/// unsafe { alloc.release(p) };
///
/// alloc.stop().unwrap();
/// ```
pub struct TierAlloc {
    config: TierConfig,
    lifecycle: Lifecycle,
    engine: OnceLock<Arc<EngineState>>,
    volatile: VolatileTier,
    monitor: Mutex<Option<MonitorHandle>>,
}

impl TierAlloc {
    /// Create an allocator with the given configuration. Nothing is
    /// mapped or spawned until `start()`.
    pub fn new(config: TierConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::new(),
            engine: OnceLock::new(),
            volatile: VolatileTier::new(),
            monitor: Mutex::new(None),
        }
    }

    /// Create an allocator configured from `TIERALLOC_*` variables.
    pub fn from_env() -> Self {
        Self::new(TierConfig::from_env())
    }

    /// Get the configuration.
    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.get()
    }

    /// Whether the policy engine is serving allocations.
    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    /// Bring the engine up: map the durable tier, load the schedule, open
    /// the statistics log and start the monitor thread.
    ///
    /// Failures of any of those degrade the engine (see the `TA` diagnostic
    /// codes) but still end in `Ready`. Only a second `start()` is an error.
    pub fn start(&self) -> Result<()> {
        self.lifecycle
            .transition(LifecycleState::Uninitialized, LifecycleState::Initializing)
            .map_err(TierError::AlreadyStarted)?;

        let tiers = establish_tiers(&self.config);
        let policy = PlacementPolicy::from_config(&self.config);
        let engine = Arc::new(EngineState::new(tiers, policy));
        let _ = self.engine.set(Arc::clone(&engine));

        let interval = self.config.poll_interval_for(engine.policy().kind());
        let sink = open_sink(&self.config);
        match monitor::spawn(engine, sink, interval) {
            Ok(handle) => *self.monitor.lock() = Some(handle),
            Err(e) => {
                diagnostics::emit_with_context(&TA201, &TierError::MonitorSpawn(e).to_string())
            }
        }

        self.lifecycle.set(LifecycleState::Ready);

        #[cfg(feature = "log")]
        log::debug!(
            "tieralloc ready: policy={}, durable tier {}",
            self.effective_policy().unwrap_or(self.config.policy),
            if self.durable_available() { "mapped" } else { "unavailable" }
        );

        Ok(())
    }

    /// Stop the monitor thread and flush the statistics log.
    ///
    /// The tiers stay mapped: memory handed out earlier can still be
    /// resized and released after `stop()`.
    pub fn stop(&self) -> Result<()> {
        self.lifecycle
            .transition(LifecycleState::Ready, LifecycleState::ShuttingDown)
            .map_err(TierError::NotRunning)?;

        let handle = self.monitor.lock().take();
        if let Some(handle) = handle {
            if handle.stop().is_err() {
                diagnostics::emit(&TA202);
            }
        }

        self.lifecycle.set(LifecycleState::Stopped);

        #[cfg(feature = "log")]
        log::debug!("tieralloc stopped: {:?}", self.stats());

        Ok(())
    }

    /// Allocate `size` bytes on the tier the policy selects.
    ///
    /// Returns null when that tier is out of memory; there is no retry on
    /// the other tier.
    pub fn allocate(&self, size: usize) -> *mut u8 {
        let Some(_guard) = tls::enter() else {
            return self.volatile.allocate(size);
        };
        match self.ready_engine() {
            Some(engine) => engine.allocate(size),
            None => self.volatile.allocate(size),
        }
    }

    /// Allocate `count * size` zeroed bytes. Null on overflow.
    pub fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        let Some(_guard) = tls::enter() else {
            return self.volatile.allocate_zeroed(count, size);
        };
        match self.ready_engine() {
            Some(engine) => engine.allocate_zeroed(count, size),
            None => self.volatile.allocate_zeroed(count, size),
        }
    }

    /// Resize `ptr` on the tier that owns it. A null `ptr` behaves as
    /// [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live pointer obtained from this allocator
    /// (or from the host heap, which backs the volatile tier).
    pub unsafe fn resize(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(size);
        }
        let guard = tls::enter();
        match self.engine.get() {
            Some(engine) => engine.resize(ptr, size, guard.is_some() && self.is_ready()),
            None => self.volatile.resize(ptr, size),
        }
    }

    /// Release `ptr` to the tier that owns it. Null is a no-op.
    ///
    /// # Safety
    ///
    /// Same contract as [`resize`](Self::resize); `ptr` must not be used
    /// afterwards.
    pub unsafe fn release(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let guard = tls::enter();
        match self.engine.get() {
            Some(engine) => engine.release(ptr, guard.is_some() && self.is_ready()),
            None => self.volatile.release(ptr),
        }
    }

    /// Which tier owns `ptr`.
    pub fn identify(&self, ptr: *const u8) -> Tier {
        self.engine
            .get()
            .map_or(Tier::Volatile, |engine| engine.tiers().identify(ptr))
    }

    /// Get current allocation statistics.
    pub fn stats(&self) -> AllocStats {
        self.engine
            .get()
            .map(|engine| engine.stats())
            .unwrap_or_default()
    }

    /// Whether the durable tier was mapped.
    pub fn durable_available(&self) -> bool {
        self.engine
            .get()
            .map_or(false, |engine| engine.tiers().durable_available())
    }

    /// The durable tier, if mapped.
    pub fn durable_tier(&self) -> Option<&DurableTier> {
        self.engine.get().and_then(|engine| engine.tiers().durable())
    }

    /// Policy actually running, after any schedule fallback.
    pub fn effective_policy(&self) -> Option<PolicyKind> {
        self.engine.get().map(|engine| engine.policy().kind())
    }

    /// Position in the schedule, for the schedule policy.
    pub fn schedule_progress(&self) -> Option<ScheduleProgress> {
        self.engine
            .get()
            .and_then(|engine| engine.policy().schedule())
            .map(|schedule| schedule.progress())
    }

    /// Whether the monitor thread is still running.
    pub fn monitor_running(&self) -> bool {
        self.monitor
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    #[inline]
    fn ready_engine(&self) -> Option<&EngineState> {
        if self.lifecycle.is_ready() {
            self.engine.get().map(|engine| &**engine)
        } else {
            None
        }
    }
}

impl Drop for TierAlloc {
    fn drop(&mut self) {
        if self.is_ready() {
            let _ = self.stop();
        }
    }
}

impl std::fmt::Debug for TierAlloc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierAlloc")
            .field("state", &self.state())
            .field("policy", &self.config.policy)
            .field("durable_available", &self.durable_available())
            .finish()
    }
}

fn establish_tiers(config: &TierConfig) -> Tiers {
    if !config.policy.uses_durable() {
        return Tiers::volatile_only();
    }
    match DurableTier::open(&config.durable_path, config.durable_capacity) {
        Ok(durable) => Tiers::with_durable(durable),
        Err(e) => {
            let diag = match e {
                TierError::ZeroCapacity { .. } => &TA002,
                _ => &TA001,
            };
            diagnostics::emit_with_context(diag, &e.to_string());
            Tiers::volatile_only()
        }
    }
}

fn open_sink(config: &TierConfig) -> LogSink {
    match LogSink::open(config.log_path.as_deref()) {
        Ok(sink) => sink,
        Err(e) => {
            diagnostics::emit_with_context(&TA301, &e.to_string());
            LogSink::Stderr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::size::kb;

    fn quiet_config(config: TierConfig, dir: &tempfile::TempDir) -> TierConfig {
        diagnostics::suppress_diagnostics(true);
        config
            .with_durable_path(dir.path())
            .with_durable_capacity(kb(512))
            .with_log_path(dir.path().join("stats.log"))
    }

    #[test]
    fn test_lifecycle_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = TierAlloc::new(quiet_config(TierConfig::monitor(), &dir));
        assert_eq!(alloc.state(), LifecycleState::Uninitialized);
        assert!(matches!(alloc.stop(), Err(TierError::NotRunning(_))));

        alloc.start().unwrap();
        assert_eq!(alloc.state(), LifecycleState::Ready);
        assert!(matches!(
            alloc.start(),
            Err(TierError::AlreadyStarted(LifecycleState::Ready))
        ));

        alloc.stop().unwrap();
        assert_eq!(alloc.state(), LifecycleState::Stopped);
        assert!(matches!(alloc.start(), Err(TierError::AlreadyStarted(_))));
    }

    #[test]
    fn test_before_start_goes_volatile_unrecorded() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = TierAlloc::new(quiet_config(TierConfig::fixed(Tier::Durable), &dir));
        let p = alloc.allocate(64);
        assert!(!p.is_null());
        assert_eq!(alloc.identify(p), Tier::Volatile);
        unsafe { alloc.release(p) };
        assert_eq!(alloc.stats(), AllocStats::default());
    }

    #[test]
    fn test_nested_call_bypasses_engine() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = TierAlloc::new(quiet_config(TierConfig::fixed(Tier::Durable), &dir));
        alloc.start().unwrap();

        let outer = tls::enter().unwrap();
        let p = alloc.allocate(32);
        assert_eq!(alloc.identify(p), Tier::Volatile);
        unsafe { alloc.release(p) };
        drop(outer);

        assert_eq!(alloc.stats().allocation_count, 0);
        let q = alloc.allocate(32);
        assert_eq!(alloc.identify(q), Tier::Durable);
        unsafe { alloc.release(q) };
        alloc.stop().unwrap();
    }

    #[test]
    fn test_durable_pointer_released_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = TierAlloc::new(quiet_config(TierConfig::fixed(Tier::Durable), &dir));
        alloc.start().unwrap();
        let p = alloc.allocate(256);
        alloc.stop().unwrap();

        assert_eq!(alloc.identify(p), Tier::Durable);
        let fresh = alloc.allocate(256);
        assert_eq!(alloc.identify(fresh), Tier::Volatile);
        unsafe {
            alloc.release(p);
            alloc.release(fresh);
        }
        assert_eq!(alloc.durable_tier().unwrap().blocks_in_use(), 0);
    }

    #[test]
    fn test_missing_durable_mount_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(TierConfig::round_robin(), &dir)
            .with_durable_path(dir.path().join("absent"));
        let alloc = TierAlloc::new(config);
        alloc.start().unwrap();

        assert!(alloc.is_ready());
        assert!(!alloc.durable_available());
        for _ in 0..4 {
            let p = alloc.allocate(16);
            assert_eq!(alloc.identify(p), Tier::Volatile);
            unsafe { alloc.release(p) };
        }
        alloc.stop().unwrap();
    }

    #[test]
    fn test_drop_stops_monitor() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = TierAlloc::new(quiet_config(TierConfig::monitor(), &dir));
        alloc.start().unwrap();
        assert!(alloc.monitor_running());
        drop(alloc);
    }
}
