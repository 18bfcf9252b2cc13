//! # tieralloc
//!
//! Tiered memory placement for unmodified programs.
//!
//! Every heap request the host program makes is sent to one of two tiers:
//! the ordinary **volatile** heap, or a **durable** region mapped from a
//! persistent-memory mount. A placement policy picks the tier per call, and
//! a background monitor thread keeps statistics on what was allocated.
//!
//! ## Features
//!
//! - Five placement policies: fixed tier, random, round-robin, a byte-volume
//!   schedule read from a file, and monitor-only
//! - Ownership by address range: `resize` and `release` always reach the tier
//!   that produced the pointer
//! - Degrades to volatile-only when the durable mount is missing or full
//! - Statistics log at a fixed cadence (250 ms, or 10 µs for schedules)
//! - `preload` feature: export `malloc`/`calloc`/`realloc`/`free` from the
//!   `cdylib` for use with `LD_PRELOAD`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tieralloc::{TierAlloc, TierConfig};
//!
//! let alloc = TierAlloc::new(TierConfig::round_robin().with_durable_path("/mnt/pmem0"));
//! alloc.start().unwrap();
//!
//! let p = alloc.allocate(4096);
//! // ... use p ...
//! unsafe { alloc.release(p) };
//!
//! alloc.stop().unwrap();
//! ```
//!
//! ## Preloading
//!
//! ```text
//! cargo build --release --features preload
//! TIERALLOC_POLICY=schedule TIERALLOC_SCHEDULE=plan.txt \
//!     LD_PRELOAD=target/release/libtieralloc.so ./program
//! ```

pub mod allocators;
pub mod api;
pub mod diagnostics;
pub mod policy;

mod core;
mod sync;
mod util;

#[cfg(all(feature = "preload", not(test)))]
mod preload;

// Re-export public API at crate root for convenience
pub use api::alloc::TierAlloc;
pub use api::config::TierConfig;
pub use api::error::{Result, TierError};
pub use api::lifecycle::LifecycleState;
pub use api::stats::AllocStats;
pub use api::tier::Tier;

// Tiers
pub use allocators::{DurableTier, TierBackend, Tiers, VolatileTier};

// Policies
pub use policy::{PolicyKind, Schedule, ScheduleProgress};

// Diagnostics
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{TA001, TA002, TA003, TA101, TA102, TA201, TA202, TA301};
