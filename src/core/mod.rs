//! Engine internals: shared state, the monitor thread and its log output.

pub(crate) mod global;
pub(crate) mod log_sink;
pub(crate) mod monitor;
pub(crate) mod tls;
