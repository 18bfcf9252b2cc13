//! Allocator configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::tier::Tier;
use crate::diagnostics::{self, TA003};
use crate::policy::PolicyKind;

/// Default directory of the persistent-memory mount.
pub const DEFAULT_DURABLE_PATH: &str = "/mnt/pmem0";

/// Default schedule file, as written by the placement planner.
pub const DEFAULT_SCHEDULE_PATH: &str = "output.txt";

/// Monitor wake-up interval when logging statistics windows.
pub const MONITOR_INTERVAL: Duration = Duration::from_millis(250);

/// Monitor wake-up interval when following a schedule.
///
/// Shorter intervals switch tiers closer to the planned byte volume at the
/// cost of more wake-ups.
pub const SCHEDULE_INTERVAL: Duration = Duration::from_micros(10);

/// Configuration for the tiered allocator.
#[derive(Debug, Clone)]
pub struct TierConfig {
    /// Placement rule (default: monitor only)
    pub policy: PolicyKind,

    /// Directory the durable tier's backing file is created in
    pub durable_path: PathBuf,

    /// Durable tier size in bytes (0 = all free space on the filesystem)
    pub durable_capacity: usize,

    /// Schedule file read by the schedule policy
    pub schedule_path: PathBuf,

    /// Statistics log file (None = stderr)
    pub log_path: Option<PathBuf>,

    /// Monitor wake-up interval (None = per-mode default)
    pub poll_interval: Option<Duration>,

    /// Seed for the random policy (None = time and pid)
    pub seed: Option<u64>,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Monitor,
            durable_path: PathBuf::from(DEFAULT_DURABLE_PATH),
            durable_capacity: 0,
            schedule_path: PathBuf::from(DEFAULT_SCHEDULE_PATH),
            log_path: None,
            poll_interval: None,
            seed: None,
        }
    }
}

impl TierConfig {
    /// Volatile placement, statistics logging only.
    pub fn monitor() -> Self {
        Self::default()
    }

    /// Every allocation on `tier`.
    pub fn fixed(tier: Tier) -> Self {
        Self {
            policy: PolicyKind::Fixed(tier),
            ..Self::default()
        }
    }

    /// Coin-flip placement.
    pub fn random() -> Self {
        Self {
            policy: PolicyKind::Random,
            ..Self::default()
        }
    }

    /// Alternating placement.
    pub fn round_robin() -> Self {
        Self {
            policy: PolicyKind::RoundRobin,
            ..Self::default()
        }
    }

    /// Placement following the schedule at `path`.
    pub fn scheduled(path: impl AsRef<Path>) -> Self {
        Self {
            policy: PolicyKind::Schedule,
            schedule_path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Builder pattern: set the durable tier directory.
    pub fn with_durable_path(mut self, path: impl AsRef<Path>) -> Self {
        self.durable_path = path.as_ref().to_path_buf();
        self
    }

    /// Builder pattern: set the durable tier capacity.
    pub fn with_durable_capacity(mut self, bytes: usize) -> Self {
        self.durable_capacity = bytes;
        self
    }

    /// Builder pattern: set the schedule file.
    pub fn with_schedule_path(mut self, path: impl AsRef<Path>) -> Self {
        self.schedule_path = path.as_ref().to_path_buf();
        self
    }

    /// Builder pattern: write statistics to a file instead of stderr.
    pub fn with_log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builder pattern: override the monitor interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Builder pattern: fix the random policy's seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Monitor interval in effect for this configuration.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval_for(self.policy)
    }

    /// Monitor interval for the policy actually running, which differs from
    /// the configured one when a schedule falls back to `Monitor`.
    pub fn poll_interval_for(&self, running: PolicyKind) -> Duration {
        self.poll_interval.unwrap_or(match running {
            PolicyKind::Schedule => SCHEDULE_INTERVAL,
            _ => MONITOR_INTERVAL,
        })
    }

    /// Configuration from `TIERALLOC_*` environment variables.
    ///
    /// | Variable                     | Field              |
    /// |------------------------------|--------------------|
    /// | `TIERALLOC_POLICY`           | `policy`           |
    /// | `TIERALLOC_DURABLE_PATH`     | `durable_path`     |
    /// | `TIERALLOC_DURABLE_CAPACITY` | `durable_capacity` |
    /// | `TIERALLOC_SCHEDULE`         | `schedule_path`    |
    /// | `TIERALLOC_LOG`              | `log_path`         |
    /// | `TIERALLOC_INTERVAL_US`      | `poll_interval`    |
    /// | `TIERALLOC_SEED`             | `seed`             |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// Unparseable values keep their default and emit `TA003`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("TIERALLOC_POLICY") {
            match val.parse() {
                Ok(policy) => config.policy = policy,
                Err(e) => diagnostics::emit_with_context(&TA003, &e.to_string()),
            }
        }
        if let Some(val) = lookup("TIERALLOC_DURABLE_PATH") {
            config.durable_path = PathBuf::from(val);
        }
        if let Some(bytes) = parse_var(&lookup, "TIERALLOC_DURABLE_CAPACITY") {
            config.durable_capacity = bytes;
        }
        if let Some(val) = lookup("TIERALLOC_SCHEDULE") {
            config.schedule_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("TIERALLOC_LOG") {
            config.log_path = Some(PathBuf::from(val));
        }
        if let Some(us) = parse_var::<u64>(&lookup, "TIERALLOC_INTERVAL_US") {
            config.poll_interval = Some(Duration::from_micros(us.max(1)));
        }
        config.seed = parse_var(&lookup, "TIERALLOC_SEED");

        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let val = lookup(key)?;
    match val.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            diagnostics::emit_with_context(&TA003, &format!("{key}={val:?}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = TierConfig::default();
        assert_eq!(c.policy, PolicyKind::Monitor);
        assert_eq!(c.durable_path, PathBuf::from("/mnt/pmem0"));
        assert_eq!(c.durable_capacity, 0);
        assert_eq!(c.effective_poll_interval(), MONITOR_INTERVAL);
        assert_eq!(
            TierConfig::scheduled("plan.txt").effective_poll_interval(),
            SCHEDULE_INTERVAL
        );
    }

    #[test]
    fn test_interval_follows_running_policy() {
        let c = TierConfig::scheduled("plan.txt");
        assert_eq!(c.poll_interval_for(PolicyKind::Schedule), SCHEDULE_INTERVAL);
        assert_eq!(c.poll_interval_for(PolicyKind::Monitor), MONITOR_INTERVAL);

        let pinned = c.with_poll_interval(Duration::from_millis(2));
        assert_eq!(pinned.poll_interval_for(PolicyKind::Monitor), Duration::from_millis(2));
    }

    #[test]
    fn test_from_lookup() {
        let c = TierConfig::from_lookup(lookup_from(&[
            ("TIERALLOC_POLICY", "round-robin"),
            ("TIERALLOC_DURABLE_PATH", "/mnt/pmem1"),
            ("TIERALLOC_DURABLE_CAPACITY", "1048576"),
            ("TIERALLOC_LOG", "alloc.log"),
            ("TIERALLOC_INTERVAL_US", "500"),
            ("TIERALLOC_SEED", "99"),
        ]));
        assert_eq!(c.policy, PolicyKind::RoundRobin);
        assert_eq!(c.durable_path, PathBuf::from("/mnt/pmem1"));
        assert_eq!(c.durable_capacity, 1 << 20);
        assert_eq!(c.log_path, Some(PathBuf::from("alloc.log")));
        assert_eq!(c.poll_interval, Some(Duration::from_micros(500)));
        assert_eq!(c.seed, Some(99));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        diagnostics::suppress_diagnostics(true);
        let c = TierConfig::from_lookup(lookup_from(&[
            ("TIERALLOC_POLICY", "fastest"),
            ("TIERALLOC_DURABLE_CAPACITY", "lots"),
        ]));
        assert_eq!(c.policy, PolicyKind::Monitor);
        assert_eq!(c.durable_capacity, 0);
    }

    #[test]
    fn test_builders() {
        let c = TierConfig::fixed(Tier::Durable)
            .with_durable_path("/tmp")
            .with_durable_capacity(4096)
            .with_poll_interval(Duration::from_millis(5))
            .with_seed(1);
        assert_eq!(c.policy, PolicyKind::Fixed(Tier::Durable));
        assert_eq!(c.effective_poll_interval(), Duration::from_millis(5));
        assert_eq!(c.seed, Some(1));
    }
}
