//! Diagnostics for degraded operation.
//!
//! Nothing the interposer runs into is allowed to take the host process
//! down, so every failure during setup turns into one of these coded
//! diagnostics plus a safer mode of operation.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                            |
//! |-------|------------------------------------|
//! | TA0xx | Configuration and tier mapping     |
//! | TA1xx | Placement schedule                 |
//! | TA2xx | Monitor thread                     |
//! | TA3xx | Statistics log                     |

pub mod emit;
pub mod kind;

pub use emit::{emit, emit_with_context, is_suppressed, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use kind::{TA001, TA002, TA003, TA101, TA102, TA201, TA202, TA301};
