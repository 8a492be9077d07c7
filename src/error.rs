//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the modsum application.
///
/// - 0: Success (nothing corrupt, nothing left missing)
/// - 1: General error (bad arguments, unreadable store, unexpected failure)
/// - 2: Findings (corrupt files found, or identifiers still unresolved)
/// - 3: Partial success (completed with some per-file errors)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed with nothing to report.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Findings: corrupt files or unresolved identifiers.
    Findings = 2,
    /// Partial success: completed but some files could not be processed.
    PartialSuccess = 3,
    /// Interrupted: the run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "MS000",
            Self::GeneralError => "MS001",
            Self::Findings => "MS002",
            Self::PartialSuccess => "MS003",
            Self::Interrupted => "MS130",
        }
    }

    /// Pick the exit code for a finished run.
    ///
    /// Interruption outranks findings, which outrank per-file errors.
    #[must_use]
    pub fn for_outcome(interrupted: bool, findings: bool, errors: bool) -> Self {
        if interrupted {
            Self::Interrupted
        } else if findings {
            Self::Findings
        } else if errors {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "MS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
