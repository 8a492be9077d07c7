//! JSON report output.
//!
//! ```json
//! {
//!   "exit_code": 2,
//!   "exit_code_name": "MS002",
//!   "report": {
//!     "command": "verify",
//!     "verify": { "checked": 120, "verified": 118, "corrupted": 2, ... }
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::RunReport;

/// A report wrapped with its exit code.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub exit_code: i32,
    pub exit_code_name: &'static str,
    pub report: &'a RunReport,
}

impl<'a> JsonOutput<'a> {
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        let code = report.exit_code();
        Self {
            exit_code: code.as_i32(),
            exit_code_name: code.code_prefix(),
            report,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur while writing a report.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}
