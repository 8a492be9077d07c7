//! Resolve phase: satisfy missing identifiers from the fingerprint store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::identifier::{DesiredIdentifier, IdentifierError};
use crate::actions::copy_file;
use crate::cache::FingerprintStore;
use crate::progress::{phase, ProgressCallback};
use crate::scanner::Fingerprint;

/// A missing identifier found in the store.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMatch {
    pub identifier: String,
    pub fingerprint: Fingerprint,
    /// Where the store last saw a file with this fingerprint.
    pub source: PathBuf,
    pub recovery_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one resolve run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    /// Non-blank lines read.
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Lines that do not end in a fingerprint.
    pub invalid: usize,
    pub copied: usize,
    pub copy_failed: usize,
    /// Bytes written to the recovery directory.
    pub bytes_copied: u64,
    pub matches: Vec<ResolvedMatch>,
    /// Identifiers with no match in the store.
    pub still_missing: Vec<String>,
    pub invalid_lines: Vec<String>,
}

impl ResolveReport {
    /// Every identifier was valid and found.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved == 0 && self.invalid == 0
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.copy_failed > 0
    }
}

/// Looks desired fingerprints up in a committed store and copies matches to
/// a recovery directory.
pub struct MissingResolver<'a> {
    store: &'a FingerprintStore,
    destination: Option<PathBuf>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl<'a> MissingResolver<'a> {
    #[must_use]
    pub fn new(store: &'a FingerprintStore) -> Self {
        Self {
            store,
            destination: None,
            progress_callback: None,
        }
    }

    /// Directory matches are copied into. Without one, matches are only reported.
    #[must_use]
    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Resolve each line of a missing-file list.
    ///
    /// Blank lines are ignored. A failed copy is recorded on its match and
    /// does not stop the remaining lines.
    pub fn resolve<I, S>(&self, lines: I) -> ResolveReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<S> = lines.into_iter().collect();
        let mut report = ResolveReport::default();

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_start(phase::RESOLVING, lines.len());
        }

        for (index, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            if let Some(cb) = &self.progress_callback {
                cb.on_progress(index + 1, line);
            }

            let id = match DesiredIdentifier::parse(line) {
                Ok(id) => id,
                Err(IdentifierError::Empty) => continue,
                Err(e) => {
                    report.total += 1;
                    log::warn!("Line {}: {}", index + 1, e);
                    report.invalid += 1;
                    report.invalid_lines.push(line.trim().to_string());
                    continue;
                }
            };
            report.total += 1;

            let Some(entry) = self.store.lookup(&id.fingerprint()) else {
                log::debug!("Still missing: {}", id.fingerprint());
                report.unresolved += 1;
                report.still_missing.push(id.as_str().to_string());
                continue;
            };

            log::info!("Found file matching {}: {}", id.fingerprint(), entry.location.display());
            report.resolved += 1;
            let recovery_name = id.recovery_file_name(&entry.location);
            let mut matched = ResolvedMatch {
                identifier: id.as_str().to_string(),
                fingerprint: id.fingerprint(),
                source: entry.location.clone(),
                recovery_name,
                copied_to: None,
                error: None,
            };

            if let Some(destination) = &self.destination {
                self.recover(&mut matched, destination, &mut report);
            }
            report.matches.push(matched);
        }

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_end(phase::RESOLVING);
        }

        log::info!(
            "Resolved {} of {} identifiers ({} still missing, {} invalid)",
            report.resolved,
            report.total,
            report.unresolved,
            report.invalid
        );
        report
    }

    fn recover(&self, matched: &mut ResolvedMatch, destination: &Path, report: &mut ResolveReport) {
        let target = destination.join(&matched.recovery_name);
        match copy_file(&matched.source, &target) {
            Ok(copied) => {
                report.copied += 1;
                report.bytes_copied += copied.bytes;
                matched.copied_to = Some(copied.to);
            }
            Err(e) => {
                log::warn!("Failed to recover {}: {}", matched.identifier, e);
                report.copy_failed += 1;
                matched.error = Some(e.to_string());
            }
        }
    }
}
