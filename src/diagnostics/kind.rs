//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - the allocator degraded to a safer mode.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `TA0xx` - Configuration and tier establishment
/// - `TA1xx` - Placement schedule
/// - `TA2xx` - Monitor thread
/// - `TA3xx` - Statistics log
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "TA001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// TA0xx - Configuration and tiers
// =============================================================================

/// TA001: Durable tier could not be mapped.
pub const TA001: Diagnostic = Diagnostic::warning(
    "TA001",
    "durable tier unavailable, placing every allocation on the volatile tier"
).with_note("the backing file could not be created or mapped in the configured directory")
 .with_help("check that TIERALLOC_DURABLE_PATH names a writable directory on a DAX or tmpfs mount");

/// TA002: Durable capacity could not be determined.
pub const TA002: Diagnostic = Diagnostic::warning(
    "TA002",
    "durable tier has no usable capacity"
).with_note("capacity 0 means \"all free space\", and the filesystem reported none")
 .with_help("set TIERALLOC_DURABLE_CAPACITY to an explicit byte count");

/// TA003: Unparseable configuration value.
pub const TA003: Diagnostic = Diagnostic::warning(
    "TA003",
    "ignoring unrecognized configuration value"
).with_note("the default for this setting is used instead");

// =============================================================================
// TA1xx - Schedule
// =============================================================================

/// TA101: Schedule could not be loaded.
pub const TA101: Diagnostic = Diagnostic::warning(
    "TA101",
    "placement schedule unreadable, falling back to monitor-only placement"
).with_note("the first token must be the switch count, followed by one byte threshold per token")
 .with_help("regenerate the schedule or point TIERALLOC_SCHEDULE at the right file");

/// TA102: Switch count larger than the thresholds present.
pub const TA102: Diagnostic = Diagnostic::warning(
    "TA102",
    "schedule switch count exceeds the thresholds it lists"
).with_note("the schedule is truncated to the thresholds that are present");

// =============================================================================
// TA2xx - Monitor thread
// =============================================================================

/// TA201: Monitor thread failed to start.
pub const TA201: Diagnostic = Diagnostic::error(
    "TA201",
    "failed to start the monitor thread"
).with_note("statistics will not be logged and scheduled tier switches will not happen");

/// TA202: Monitor thread panicked.
pub const TA202: Diagnostic = Diagnostic::error(
    "TA202",
    "monitor thread terminated abnormally"
).with_note("the statistics log may be incomplete");

// =============================================================================
// TA3xx - Statistics log
// =============================================================================

/// TA301: Log file could not be opened.
pub const TA301: Diagnostic = Diagnostic::warning(
    "TA301",
    "cannot open statistics log file, writing to stderr"
).with_help("check TIERALLOC_LOG");
