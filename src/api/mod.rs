//! Public API for tieralloc.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with [`TierAlloc`](alloc::TierAlloc)
//! and [`TierConfig`](config::TierConfig).

pub mod alloc;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod stats;
pub mod tier;
