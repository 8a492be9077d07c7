//! Corruption verification of origin-encoded files.
//!
//! Every file whose name embeds a fingerprint is hashed and compared with
//! that fingerprint. A match records the name in the directory's
//! [`VerifiedSet`]; a mismatch quarantines the file and its derived
//! artifacts. Names already in the set (and not modified since) are skipped
//! without being read.
//!
//! The fingerprint store is never consulted here.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use super::quarantine::{DerivedDir, Disposition, QuarantinedFile, Quarantine};
use crate::cache::{StoreError, VerifiedSet};
use crate::progress::{phase, ProgressCallback};
use crate::scanner::indexer::{hashing_pool, FileFailure};
use crate::scanner::{FileEntry, Fingerprint, HashError, Hasher, OriginPattern, Walker, WalkerConfig};

/// Errors that stop a verification run.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A verified-set record could not be written.
    #[error("failed to record verified files: {0}")]
    Store(#[from] StoreError),
}

/// A file whose content no longer matches its name.
#[derive(Debug, Clone, Serialize)]
pub struct CorruptFile {
    pub path: PathBuf,
    pub expected: Fingerprint,
    pub actual: Fingerprint,
    /// The file itself first, then any derived artifacts.
    pub quarantined: Vec<QuarantinedFile>,
}

/// Outcome of one verification run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    /// Directories holding at least one origin-encoded file.
    pub directories: usize,
    /// Origin-encoded files found.
    pub checked: usize,
    /// Files hashed and found intact.
    pub verified: usize,
    /// Files skipped because an earlier run verified them.
    pub skipped: usize,
    /// Files hashed and found corrupt.
    pub corrupted: usize,
    /// Derived artifacts found for corrupt files.
    pub derived_quarantined: usize,
    /// Quarantine moves that failed.
    pub relocation_failures: usize,
    pub corrupted_files: Vec<CorruptFile>,
    pub errors: Vec<FileFailure>,
    pub interrupted: bool,
}

impl VerifyReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.relocation_failures > 0
    }
}

/// Re-hashes origin-encoded files and quarantines mismatches.
pub struct CorruptionVerifier {
    walker_config: WalkerConfig,
    pattern: OriginPattern,
    hasher: Hasher,
    verified_file_name: String,
    derived_dirs: Vec<DerivedDir>,
    backup: Option<PathBuf>,
    full: bool,
    io_threads: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CorruptionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorruptionVerifier")
            .field("pattern", &self.pattern)
            .field("verified_file_name", &self.verified_file_name)
            .field("derived_dirs", &self.derived_dirs)
            .field("backup", &self.backup)
            .field("full", &self.full)
            .field("io_threads", &self.io_threads)
            .finish_non_exhaustive()
    }
}

impl CorruptionVerifier {
    #[must_use]
    pub fn new(
        walker_config: WalkerConfig,
        pattern: OriginPattern,
        verified_file_name: impl Into<String>,
    ) -> Self {
        Self {
            walker_config,
            pattern,
            hasher: Hasher::new(),
            verified_file_name: verified_file_name.into(),
            derived_dirs: Vec::new(),
            backup: None,
            full: false,
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Derived-artifact directories checked when a file is corrupt.
    #[must_use]
    pub fn with_derived_dirs(mut self, dirs: Vec<DerivedDir>) -> Self {
        self.derived_dirs = dirs;
        self
    }

    /// Directory corrupt files are moved to. Without one they are only reported.
    #[must_use]
    pub fn with_backup(mut self, backup: Option<PathBuf>) -> Self {
        self.backup = backup;
        self
    }

    /// Re-hash every file, ignoring earlier verification records.
    #[must_use]
    pub fn with_full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Verify every origin-encoded file under `root`.
    ///
    /// Unreadable files are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] if a verified-set record cannot be written.
    pub fn verify(&self, root: &Path) -> Result<VerifyReport, VerifyError> {
        let mut report = VerifyReport::default();

        let mut walker = Walker::new(root, self.walker_config.clone());
        if let Some(flag) = &self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        let root = walker.root();
        let quarantine = Quarantine::new(root.clone(), self.backup.clone(), self.derived_dirs.clone());

        let mut by_dir: BTreeMap<PathBuf, Vec<(FileEntry, Fingerprint)>> = BTreeMap::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    let Some(expected) = self.pattern.embedded_fingerprint(&file.file_name()) else {
                        continue;
                    };
                    let dir = file.path.parent().map(Path::to_path_buf).unwrap_or_default();
                    by_dir.entry(dir).or_default().push((file, expected));
                }
                Err(e) => report.errors.push(FileFailure::new(e.path(), &e)),
            }
        }
        report.checked = by_dir.values().map(Vec::len).sum();

        let pool = hashing_pool(self.io_threads);
        let counter = AtomicUsize::new(0);

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_start(phase::VERIFYING, report.checked);
        }

        for (dir, files) in &by_dir {
            if self.is_shutdown_requested() {
                report.interrupted = true;
                break;
            }
            report.directories += 1;
            self.verify_directory(dir, files, &quarantine, pool.as_ref(), &counter, &mut report)?;
        }

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_end(phase::VERIFYING);
        }

        log::info!(
            "Checked {} files in {} directories: {} verified, {} skipped, {} corrupt",
            report.checked,
            report.directories,
            report.verified,
            report.skipped,
            report.corrupted
        );
        Ok(report)
    }

    fn verify_directory(
        &self,
        dir: &Path,
        files: &[(FileEntry, Fingerprint)],
        quarantine: &Quarantine,
        pool: Option<&rayon::ThreadPool>,
        counter: &AtomicUsize,
        report: &mut VerifyReport,
    ) -> Result<(), VerifyError> {
        let mut set = VerifiedSet::load(dir, &self.verified_file_name).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable verification record: {}", e);
            VerifiedSet::empty(dir, &self.verified_file_name)
        });

        let (skipped, todo): (Vec<_>, Vec<_>) = files
            .iter()
            .partition(|(file, _)| !self.full && set.is_verified(&file.file_name(), file.modified));
        report.skipped += skipped.len();
        for (file, _) in &skipped {
            log::trace!("Already verified: {}", file.path.display());
        }

        let results = self.hash_pending(&todo, pool, counter);

        for ((file, expected), result) in todo.iter().zip(results) {
            let name = file.file_name();
            match result {
                Some(Ok(actual)) if actual == *expected => {
                    report.verified += 1;
                    set.insert(&name);
                }
                Some(Ok(actual)) => {
                    log::warn!(
                        "Corrupt: {} (expected {}, got {})",
                        file.path.display(),
                        expected,
                        actual
                    );
                    report.corrupted += 1;
                    set.remove(&name);

                    let quarantined = quarantine.quarantine(&file.path);
                    report.derived_quarantined += quarantined.iter().filter(|q| q.derived).count();
                    report.relocation_failures += quarantined
                        .iter()
                        .filter(|q| matches!(q.disposition, Disposition::Failed { .. }))
                        .count();
                    report.corrupted_files.push(CorruptFile {
                        path: file.path.clone(),
                        expected: *expected,
                        actual,
                        quarantined,
                    });
                }
                Some(Err(e)) => {
                    log::warn!("Skipping unreadable file: {}", e);
                    report.errors.push(FileFailure::new(e.path(), &e));
                }
                None => report.interrupted = true,
            }
        }

        let present: HashSet<String> = files.iter().map(|(file, _)| file.file_name()).collect();
        set.retain(|name| present.contains(name));
        set.persist()?;
        Ok(())
    }

    /// Hash `todo` in order, on `pool` when there is one.
    ///
    /// `None` marks files skipped after a shutdown request.
    fn hash_pending(
        &self,
        todo: &[&(FileEntry, Fingerprint)],
        pool: Option<&rayon::ThreadPool>,
        counter: &AtomicUsize,
    ) -> Vec<Option<Result<Fingerprint, HashError>>> {
        let work = |(file, _): &&(FileEntry, Fingerprint)| {
            if self.is_shutdown_requested() {
                return None;
            }
            let result = self.hasher.hash_file(&file.path);
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(cb) = &self.progress_callback {
                cb.on_progress(done, &file.path.to_string_lossy());
            }
            Some(result)
        };
        match pool {
            Some(pool) => pool.install(|| todo.par_iter().map(work).collect()),
            None => todo.iter().map(work).collect(),
        }
    }
}
