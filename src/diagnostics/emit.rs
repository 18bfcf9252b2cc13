//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr and the log facade.

#[cfg(any(debug_assertions, feature = "diagnostics"))]
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::Diagnostic;
#[cfg(feature = "log")]
use super::kind::DiagnosticKind;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
///
/// Goes to stderr in debug builds or with the `diagnostics` feature, and to
/// the `log` facade when the `log` feature is on.
pub fn emit(diag: &Diagnostic) {
    emit_with_context(diag, "");
}

/// Emit a diagnostic with additional runtime context (usually an error's text).
#[allow(unused_variables)]
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    if is_suppressed() {
        return;
    }

    #[cfg(any(debug_assertions, feature = "diagnostics"))]
    emit_to_stderr(diag, context);

    #[cfg(feature = "log")]
    emit_to_log(diag, context);
}

/// Internal: emit to stderr.
#[cfg(any(debug_assertions, feature = "diagnostics"))]
fn emit_to_stderr(diag: &Diagnostic, context: &str) {
    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(
        stderr,
        "[tieralloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if !context.is_empty() {
        let _ = writeln!(stderr, "  context: {}", context);
    }

    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }

    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
}

/// Emit a diagnostic using the log crate.
#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: &str) {
    match diag.kind {
        DiagnosticKind::Error => {
            log::error!("[{}] {} {}", diag.code, diag.message, context);
        }
        DiagnosticKind::Warning => {
            log::warn!("[{}] {} {}", diag.code, diag.message, context);
        }
        DiagnosticKind::Note => {
            log::info!("[{}] {} {}", diag.code, diag.message, context);
        }
    }

    if let Some(note) = diag.note {
        log::debug!("  note: {}", note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::TA001;

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        emit(&TA001);
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }
}
