//! Error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::lifecycle::LifecycleState;

/// Errors raised while configuring or driving a [`TierAlloc`](crate::TierAlloc).
///
/// None of these ever reach a caller of the allocation entry points: those
/// report failure as a null pointer. Tier, schedule and monitor errors are
/// turned into diagnostics and a degraded mode during `start()`.
#[derive(Debug, Error)]
pub enum TierError {
    #[error("durable tier at {path} is unavailable: {source}")]
    DurableUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("durable tier at {path} has no usable capacity")]
    ZeroCapacity { path: PathBuf },

    #[error("cannot read schedule {path}: {source}")]
    ScheduleIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("schedule is empty, expected a switch count")]
    MissingSwitchCount,

    #[error("invalid schedule switch count {0:?}")]
    InvalidSwitchCount(String),

    #[error("invalid schedule threshold #{index}: {token:?}")]
    InvalidThreshold { index: usize, token: String },

    #[error("unknown placement policy {0:?}")]
    UnknownPolicy(String),

    #[error("allocator already started (state: {0})")]
    AlreadyStarted(LifecycleState),

    #[error("allocator is not running (state: {0})")]
    NotRunning(LifecycleState),

    #[error("failed to spawn the monitor thread: {0}")]
    MonitorSpawn(#[source] io::Error),
}

pub type Result<T, E = TierError> = std::result::Result<T, E>;
