//! Human-readable report output.
//!
//! Colors come from `yansi` and are dropped globally by `--no-color`.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use super::RunReport;
use crate::resolve::ResolveReport;
use crate::scanner::indexer::FileFailure;
use crate::scanner::ScanReport;
use crate::verify::{Disposition, VerifyReport};

/// Plain-text renderer for a [`RunReport`].
#[derive(Debug)]
pub struct TextOutput<'a> {
    report: &'a RunReport,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        Self { report }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self.report {
            RunReport::Index { scan } => write_scan(w, scan),
            RunReport::FindMissing { scan, resolve } => {
                write_scan(w, scan)?;
                match resolve {
                    Some(resolve) => write_resolve(w, resolve),
                    None => writeln!(w, "{}", "Interrupted before resolving.".yellow()),
                }
            }
            RunReport::Verify { verify } => write_verify(w, verify),
        }
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_scan<W: Write>(w: &mut W, scan: &ScanReport) -> io::Result<()> {
    writeln!(w, "{}", "Scan".bold())?;
    writeln!(w, "  files found:      {}", scan.files_seen)?;
    writeln!(w, "  unchanged:        {}", scan.files_unchanged)?;
    writeln!(w, "  read from name:   {}", scan.files_from_name)?;
    writeln!(w, "  hashed:           {}", scan.files_hashed)?;
    writeln!(w, "  duplicates:       {}", scan.duplicates)?;
    if scan.stale_entries > 0 {
        writeln!(w, "  stale entries:    {}", scan.stale_entries)?;
    }
    write_failures(w, &scan.errors)?;
    if scan.interrupted {
        writeln!(w, "  {}", "interrupted; progress so far was saved".yellow())?;
    }
    Ok(())
}

fn write_resolve<W: Write>(w: &mut W, resolve: &ResolveReport) -> io::Result<()> {
    writeln!(w, "{}", "Missing files".bold())?;
    for m in &resolve.matches {
        match (&m.copied_to, &m.error) {
            (Some(to), _) => writeln!(w, "  {} {} -> {}", "recovered".green(), m.source.display(), to.display())?,
            (None, Some(error)) => writeln!(w, "  {} {}: {}", "failed".red(), m.source.display(), error)?,
            (None, None) => writeln!(w, "  {} {} ({})", "found".green(), m.source.display(), m.recovery_name)?,
        }
    }
    for id in &resolve.still_missing {
        writeln!(w, "  {} {}", "missing".yellow(), id)?;
    }
    for line in &resolve.invalid_lines {
        writeln!(w, "  {} {}", "invalid".red(), line)?;
    }
    writeln!(
        w,
        "  {} of {} resolved, {} still missing, {} invalid",
        resolve.resolved, resolve.total, resolve.unresolved, resolve.invalid
    )?;
    if resolve.copied > 0 || resolve.copy_failed > 0 {
        writeln!(
            w,
            "  copied {} ({}), {} failed",
            resolve.copied,
            ByteSize::b(resolve.bytes_copied),
            resolve.copy_failed
        )?;
    }
    Ok(())
}

fn write_verify<W: Write>(w: &mut W, verify: &VerifyReport) -> io::Result<()> {
    writeln!(w, "{}", "Verify".bold())?;
    for corrupt in &verify.corrupted_files {
        writeln!(w, "  {} {}", "corrupt".red().bold(), corrupt.path.display())?;
        writeln!(w, "    expected {}", corrupt.expected)?;
        writeln!(w, "    actual   {}", corrupt.actual)?;
        for q in &corrupt.quarantined {
            let label = if q.derived { "derived" } else { "file" };
            match &q.disposition {
                Disposition::Moved { to } => writeln!(w, "    {label} moved to {}", to.display())?,
                Disposition::Reported if q.derived => {
                    writeln!(w, "    {label} {}", q.path.display())?;
                }
                Disposition::Reported => {}
                Disposition::Failed { error } => {
                    writeln!(w, "    {label} {} {}", "not moved:".red(), error)?;
                }
            }
        }
    }
    writeln!(w, "  directories:      {}", verify.directories)?;
    writeln!(w, "  checked:          {}", verify.checked)?;
    writeln!(w, "  verified:         {}", verify.verified)?;
    writeln!(w, "  already verified: {}", verify.skipped)?;
    let corrupted = format!("{}", verify.corrupted);
    if verify.corrupted > 0 {
        writeln!(w, "  corrupt:          {}", corrupted.red().bold())?;
    } else {
        writeln!(w, "  corrupt:          {}", corrupted.green())?;
    }
    if verify.derived_quarantined > 0 {
        writeln!(w, "  derived artifacts: {}", verify.derived_quarantined)?;
    }
    write_failures(w, &verify.errors)?;
    if verify.interrupted {
        writeln!(w, "  {}", "interrupted".yellow())?;
    }
    Ok(())
}

fn write_failures<W: Write>(w: &mut W, failures: &[FileFailure]) -> io::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    writeln!(w, "  {} {}", "errors:".red(), failures.len())?;
    for failure in failures {
        writeln!(w, "    {}: {}", failure.path.display(), failure.message)?;
    }
    Ok(())
}
