//! The background monitor thread.
//!
//! Wakes once per interval and hands control to [`EngineState::tick`]:
//! either logging and closing a statistics window, or advancing the
//! placement schedule. A schedule that runs out ends the thread on its own.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::global::{EngineState, Tick};
use crate::core::log_sink::LogSink;

/// Owner's side of a running monitor.
pub(crate) struct MonitorHandle {
    shutdown: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal shutdown, wake the thread and wait for it.
    pub fn stop(self) -> thread::Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.thread.thread().unpark();
        self.thread.join()
    }

    /// The thread has returned (schedule exhausted or stopped).
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Start the monitor for `engine`.
pub(crate) fn spawn(
    engine: Arc<EngineState>,
    sink: LogSink,
    interval: Duration,
) -> io::Result<MonitorHandle> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    let thread = thread::Builder::new()
        .name("tieralloc-monitor".into())
        .spawn(move || run(&engine, sink, &flag, interval))?;
    Ok(MonitorHandle { shutdown, thread })
}

fn run(engine: &EngineState, mut sink: LogSink, shutdown: &AtomicBool, interval: Duration) {
    let mut deadline = Instant::now() + interval;

    while !shutdown.load(Ordering::Acquire) {
        let now = Instant::now();
        if now < deadline {
            // Spurious and early wake-ups just re-check the flag and deadline.
            thread::park_timeout(deadline - now);
            continue;
        }

        // Never burst to catch up after a stall.
        deadline = (deadline + interval).max(now + interval / 2);

        if engine.tick(&mut sink) == Tick::Finished {
            shutdown.store(true, Ordering::Release);
        }
    }

    sink.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocators::{DurableTier, Tiers};
    use crate::api::tier::Tier;
    use crate::policy::{PlacementPolicy, Schedule, ScheduleState};
    use crate::util::size::kb;

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let end = Instant::now() + timeout;
        while Instant::now() < end {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn test_monitor_writes_a_line_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("stats.log");
        let engine = Arc::new(EngineState::new(Tiers::volatile_only(), PlacementPolicy::Monitor));
        let sink = LogSink::open(Some(&log)).unwrap();

        let handle = spawn(Arc::clone(&engine), sink, Duration::from_millis(5)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || engine.stats().windows_closed >= 3));
        handle.stop().unwrap();

        let closed = engine.stats().windows_closed;
        let lines = std::fs::read_to_string(&log).unwrap().lines().count() as u64;
        assert_eq!(lines, closed);
    }

    #[test]
    fn test_stop_does_not_wait_for_long_interval() {
        let engine = Arc::new(EngineState::new(Tiers::volatile_only(), PlacementPolicy::Monitor));
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::open(Some(&dir.path().join("stats.log"))).unwrap();
        let handle = spawn(Arc::clone(&engine), sink, Duration::from_secs(3600)).unwrap();

        let started = Instant::now();
        handle.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(engine.stats().windows_closed, 0);
    }

    #[test]
    fn test_schedule_drives_tier_and_ends_thread() {
        let dir = tempfile::tempdir().unwrap();
        let tiers = Tiers::with_durable(DurableTier::open(dir.path(), kb(256)).unwrap());
        let state = ScheduleState::new(&Schedule::new(2, vec![100, 50]));
        let engine = Arc::new(EngineState::new(tiers, PlacementPolicy::Schedule(state)));
        let sink = LogSink::open(Some(&dir.path().join("stats.log"))).unwrap();
        let handle = spawn(Arc::clone(&engine), sink, Duration::from_micros(100)).unwrap();

        assert_eq!(engine.select_tier(), Tier::Durable);
        let a = engine.allocate(100);
        assert!(wait_until(Duration::from_secs(5), || engine.select_tier() == Tier::Volatile));

        let b = engine.allocate(50);
        assert!(wait_until(Duration::from_secs(5), || handle.is_finished()));
        assert_eq!(engine.select_tier(), Tier::Volatile);

        let c = engine.allocate(1 << 12);
        assert_eq!(engine.tiers().identify(c), Tier::Volatile);
        handle.stop().unwrap();

        unsafe {
            engine.release(a, true);
            engine.release(b, true);
            engine.release(c, true);
        }
    }
}
