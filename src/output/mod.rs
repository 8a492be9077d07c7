//! Report rendering.
//!
//! Every command produces a [`RunReport`], which decides the process exit
//! code and is rendered either as human-readable text ([`text`]) or as JSON
//! ([`json`]).

pub mod json;
pub mod text;

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::ExitCode;
use crate::resolve::ResolveReport;
use crate::scanner::ScanReport;
use crate::verify::VerifyReport;

pub use json::{JsonOutput, OutputError};
pub use text::TextOutput;

/// The result of one command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum RunReport {
    Index {
        scan: ScanReport,
    },
    FindMissing {
        scan: ScanReport,
        /// `None` when the build phase was interrupted.
        resolve: Option<ResolveReport>,
    },
    Verify {
        verify: VerifyReport,
    },
}

impl RunReport {
    /// Exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Index { scan } => ExitCode::for_outcome(scan.interrupted, false, scan.has_errors()),
            Self::FindMissing { scan, resolve } => match resolve {
                Some(resolve) => ExitCode::for_outcome(
                    false,
                    !resolve.is_complete(),
                    scan.has_errors() || resolve.has_errors(),
                ),
                None => ExitCode::Interrupted,
            },
            Self::Verify { verify } => ExitCode::for_outcome(
                verify.interrupted,
                verify.corrupted > 0,
                verify.has_errors(),
            ),
        }
    }

    /// Render the report in the requested format.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, format: OutputFormat) -> Result<(), OutputError> {
        match format {
            OutputFormat::Text => TextOutput::new(self).write_to(writer)?,
            OutputFormat::Json => JsonOutput::new(self).write_to(writer, true)?,
        }
        Ok(())
    }
}
