//! Build phase: walk a tree and populate the fingerprint store.
//!
//! # Overview
//!
//! 1. Walk the tree with the configured exclusions.
//! 2. Skip files the store already records at the same location with the
//!    same size and modification time, so an unchanged tree costs no hashing.
//! 3. Fingerprint the rest. Content hashing runs on a bounded rayon pool;
//!    origin-encoded names need no I/O.
//! 4. Insert results into the store one at a time, in walk order, so the
//!    most recently walked duplicate wins deterministically.
//!
//! The store is not flushed here; callers flush once the scan returns,
//! including when it reports per-file errors.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use super::fingerprint::{FingerprintExtractor, FingerprintSource, Strategy};
use super::walker::Walker;
use super::{FileEntry, HashError, WalkerConfig};
use crate::cache::{CacheEntry, FingerprintStore, ScanRecord};
use crate::progress::{phase, ProgressCallback};

/// A file that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

impl FileFailure {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Outcome of one build-phase scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Eligible files found by the walk.
    pub files_seen: usize,
    /// Files newly fingerprinted this run (by name or by content).
    pub files_processed: usize,
    /// Files whose content was hashed.
    pub files_hashed: usize,
    /// Files fingerprinted from their origin-encoded name.
    pub files_from_name: usize,
    /// Files skipped because the store already has them.
    pub files_unchanged: usize,
    /// Insertions that replaced an existing fingerprint entry.
    pub duplicates: usize,
    /// Entries released because the file they pointed at has changed.
    pub stale_entries: usize,
    /// Files that could not be read.
    pub errors: Vec<FileFailure>,
    /// Whether the scan stopped early on a shutdown request.
    pub interrupted: bool,
}

impl ScanReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Walks a tree and feeds each eligible file to the fingerprint store.
pub struct TreeScanner {
    walker_config: WalkerConfig,
    extractor: FingerprintExtractor,
    io_threads: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for TreeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeScanner")
            .field("walker_config", &self.walker_config)
            .field("extractor", &self.extractor)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl TreeScanner {
    #[must_use]
    pub fn new(walker_config: WalkerConfig, extractor: FingerprintExtractor) -> Self {
        Self {
            walker_config,
            extractor,
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Number of threads used for content hashing (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
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

    /// Scan `root` into `store`.
    ///
    /// Per-file failures are collected in the report and never abort the
    /// scan.
    pub fn scan(&self, root: &Path, store: &mut FingerprintStore) -> ScanReport {
        let mut report = ScanReport::default();

        let files = self.collect_files(root, &mut report);
        report.files_seen = files.len();

        let pending: Vec<FileEntry> = files
            .into_iter()
            .filter(|file| {
                let current = store.is_current(&file.path, file.size, file.modified);
                if current {
                    log::trace!("Unchanged since last scan: {}", file.path.display());
                }
                !current
            })
            .collect();
        report.files_unchanged = report.files_seen - pending.len();

        log::debug!(
            "{} of {} files need fingerprinting",
            pending.len(),
            report.files_seen
        );

        let results = self.fingerprint_all(&pending);

        for (file, result) in pending.iter().zip(results) {
            match result {
                Some(Ok(extracted)) => {
                    report.files_processed += 1;
                    match extracted.source {
                        FingerprintSource::Name => report.files_from_name += 1,
                        FingerprintSource::Content => report.files_hashed += 1,
                    }
                    if store
                        .release_location(&file.path, Some(extracted.fingerprint))
                        .is_some()
                    {
                        report.stale_entries += 1;
                    }
                    let entry = CacheEntry::new(extracted.fingerprint, file.path.clone());
                    if store.insert_or_update(entry) {
                        log::debug!(
                            "Duplicate fingerprint {} at {}",
                            extracted.fingerprint,
                            file.path.display()
                        );
                        report.duplicates += 1;
                    }
                    store.record_scan(
                        &file.path,
                        ScanRecord::for_file(extracted.fingerprint, file),
                    );
                }
                Some(Err(e)) => {
                    if store.release_location(&file.path, None).is_some() {
                        report.stale_entries += 1;
                    }
                    log::warn!("Skipping unreadable file: {}", e);
                    report.errors.push(FileFailure::new(e.path(), &e));
                }
                None => report.interrupted = true,
            }
        }

        if self.is_shutdown_requested() {
            report.interrupted = true;
        }

        log::info!(
            "Scanned {} files: {} new ({} hashed, {} from name), {} unchanged, {} duplicates, {} stale",
            report.files_seen,
            report.files_processed,
            report.files_hashed,
            report.files_from_name,
            report.files_unchanged,
            report.duplicates,
            report.stale_entries
        );
        report
    }

    fn collect_files(&self, root: &Path, report: &mut ScanReport) -> Vec<FileEntry> {
        let mut walker = Walker::new(root, self.walker_config.clone());
        if let Some(flag) = &self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_start(phase::WALKING, 0);
        }

        let mut files = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    files.push(file);
                    if let Some(cb) = &self.progress_callback {
                        cb.on_progress(files.len(), &files[files.len() - 1].path.to_string_lossy());
                    }
                }
                Err(e) => report.errors.push(FileFailure::new(e.path(), &e)),
            }
        }

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_end(phase::WALKING);
        }
        files
    }

    /// Fingerprint every file, preserving input order.
    ///
    /// `None` marks files skipped after a shutdown request.
    fn fingerprint_all(
        &self,
        files: &[FileEntry],
    ) -> Vec<Option<Result<super::Extracted, HashError>>> {
        if let Some(cb) = &self.progress_callback {
            cb.on_phase_start(phase::HASHING, files.len());
        }

        let counter = AtomicUsize::new(0);
        let work = |file: &FileEntry| {
            if self.is_shutdown_requested() {
                return None;
            }
            let result = self.extractor.extract_file(&file.path);
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(cb) = &self.progress_callback {
                cb.on_progress(done, &file.path.to_string_lossy());
            }
            Some(result)
        };

        let needs_pool = files.iter().any(|f| {
            matches!(
                self.extractor.pattern().strategy(&f.file_name()),
                Strategy::Content
            )
        });

        let pool = if needs_pool {
            hashing_pool(self.io_threads)
        } else {
            None
        };
        let results = match pool {
            Some(pool) => pool.install(|| files.par_iter().map(work).collect()),
            None => files.iter().map(work).collect(),
        };

        if let Some(cb) = &self.progress_callback {
            cb.on_phase_end(phase::HASHING);
        }
        results
    }
}

/// Thread pool for content hashing.
///
/// `None` when the pool cannot be started; callers hash sequentially.
pub(crate) fn hashing_pool(threads: usize) -> Option<rayon::ThreadPool> {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("Failed to build hashing pool, hashing sequentially: {}", e);
            None
        }
    }
}
