//! Placement policies.
//!
//! | Policy       | Rule                                                   |
//! |--------------|--------------------------------------------------------|
//! | `Fixed`      | always the configured tier                             |
//! | `Random`     | volatile or durable with probability 0.5, per call     |
//! | `RoundRobin` | `counter % 2`, counter shared by all threads           |
//! | `Schedule`   | the tier of the schedule's current segment             |
//! | `Monitor`    | always volatile; statistics only                       |

pub mod random;
pub mod round_robin;
pub mod schedule;

use std::str::FromStr;

use crate::api::config::TierConfig;
use crate::api::error::TierError;
use crate::api::tier::Tier;
use crate::diagnostics::{self, TA101, TA102};

pub use random::RandomPlacement;
pub use round_robin::RoundRobin;
pub use schedule::{Advance, Schedule, ScheduleProgress, ScheduleState};

/// Which placement rule to run, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolicyKind {
    /// Everything on volatile; statistics are still logged.
    #[default]
    Monitor,
    /// Everything on one tier.
    Fixed(Tier),
    /// Coin flip per call.
    Random,
    /// Alternate per call.
    RoundRobin,
    /// Follow a byte-volume schedule file.
    Schedule,
}

impl PolicyKind {
    /// Whether this policy can ever place on the durable tier.
    pub fn uses_durable(&self) -> bool {
        !matches!(self, PolicyKind::Monitor | PolicyKind::Fixed(Tier::Volatile))
    }
}

impl FromStr for PolicyKind {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monitor" => Ok(PolicyKind::Monitor),
            "volatile" | "dram" => Ok(PolicyKind::Fixed(Tier::Volatile)),
            "durable" | "pmem" | "optane" => Ok(PolicyKind::Fixed(Tier::Durable)),
            "random" => Ok(PolicyKind::Random),
            "round-robin" | "roundrobin" | "rr" => Ok(PolicyKind::RoundRobin),
            "schedule" | "placement" => Ok(PolicyKind::Schedule),
            _ => Err(TierError::UnknownPolicy(s.to_string())),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::Monitor => f.write_str("monitor"),
            PolicyKind::Fixed(tier) => write!(f, "fixed({tier})"),
            PolicyKind::Random => f.write_str("random"),
            PolicyKind::RoundRobin => f.write_str("round-robin"),
            PolicyKind::Schedule => f.write_str("schedule"),
        }
    }
}

/// A policy with its runtime state.
pub(crate) enum PlacementPolicy {
    Fixed(Tier),
    Random(RandomPlacement),
    RoundRobin(RoundRobin),
    Schedule(ScheduleState),
    Monitor,
}

impl PlacementPolicy {
    /// Build the configured policy, loading the schedule if there is one.
    ///
    /// An unusable schedule degrades to `Monitor`.
    pub fn from_config(config: &TierConfig) -> Self {
        match config.policy {
            PolicyKind::Monitor => PlacementPolicy::Monitor,
            PolicyKind::Fixed(tier) => PlacementPolicy::Fixed(tier),
            PolicyKind::Random => PlacementPolicy::Random(RandomPlacement::new(
                config.seed.unwrap_or_else(RandomPlacement::entropy_seed),
            )),
            PolicyKind::RoundRobin => PlacementPolicy::RoundRobin(RoundRobin::new()),
            PolicyKind::Schedule => match Schedule::load(&config.schedule_path) {
                Ok(schedule) => {
                    if schedule.is_truncated() {
                        diagnostics::emit(&TA102);
                    }
                    PlacementPolicy::Schedule(ScheduleState::new(&schedule))
                }
                Err(e) => {
                    diagnostics::emit_with_context(&TA101, &e.to_string());
                    PlacementPolicy::Monitor
                }
            },
        }
    }

    #[inline]
    pub fn select_tier(&self) -> Tier {
        match self {
            PlacementPolicy::Fixed(tier) => *tier,
            PlacementPolicy::Random(r) => r.select_tier(),
            PlacementPolicy::RoundRobin(rr) => rr.select_tier(),
            PlacementPolicy::Schedule(s) => s.active_tier(),
            PlacementPolicy::Monitor => Tier::Volatile,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            PlacementPolicy::Fixed(tier) => PolicyKind::Fixed(*tier),
            PlacementPolicy::Random(_) => PolicyKind::Random,
            PlacementPolicy::RoundRobin(_) => PolicyKind::RoundRobin,
            PlacementPolicy::Schedule(_) => PolicyKind::Schedule,
            PlacementPolicy::Monitor => PolicyKind::Monitor,
        }
    }

    pub fn schedule(&self) -> Option<&ScheduleState> {
        match self {
            PlacementPolicy::Schedule(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_policy_names() {
        assert_eq!("rr".parse::<PolicyKind>().unwrap(), PolicyKind::RoundRobin);
        assert_eq!(
            "PMEM".parse::<PolicyKind>().unwrap(),
            PolicyKind::Fixed(Tier::Durable)
        );
        assert_eq!(
            " dram ".parse::<PolicyKind>().unwrap(),
            PolicyKind::Fixed(Tier::Volatile)
        );
        assert!(matches!(
            "lru".parse::<PolicyKind>(),
            Err(TierError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_uses_durable() {
        assert!(!PolicyKind::Monitor.uses_durable());
        assert!(!PolicyKind::Fixed(Tier::Volatile).uses_durable());
        assert!(PolicyKind::Fixed(Tier::Durable).uses_durable());
        assert!(PolicyKind::Schedule.uses_durable());
    }

    #[test]
    fn test_fixed_and_monitor_select() {
        let fixed = PlacementPolicy::from_config(&TierConfig::fixed(Tier::Durable));
        assert!((0..10).all(|_| fixed.select_tier() == Tier::Durable));
        let monitor = PlacementPolicy::from_config(&TierConfig::monitor());
        assert_eq!(monitor.select_tier(), Tier::Volatile);
    }

    #[test]
    fn test_bad_schedule_degrades_to_monitor() {
        diagnostics::suppress_diagnostics(true);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        fs::write(&path, "not-a-number\n").unwrap();

        let policy = PlacementPolicy::from_config(&TierConfig::scheduled(&path));
        assert_eq!(policy.kind(), PolicyKind::Monitor);
        assert_eq!(policy.select_tier(), Tier::Volatile);
    }

    #[test]
    fn test_schedule_policy_reads_active_tier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        fs::write(&path, "2\n0\n10\n").unwrap();

        let policy = PlacementPolicy::from_config(&TierConfig::scheduled(&path));
        assert_eq!(policy.kind(), PolicyKind::Schedule);
        assert_eq!(policy.select_tier(), Tier::Volatile);
        assert_eq!(policy.schedule().unwrap().progress().cursor, 1);
    }
}
