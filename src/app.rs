//! Command handlers behind [`run_app`](crate::run_app).
//!
//! Each handler validates its paths before touching the tree, runs its
//! pipeline and returns a [`RunReport`].

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use crate::cache::FingerprintStore;
use crate::cli::{FindMissingArgs, IndexArgs, OutputFormat, RunArgs, StoreArgs, VerifyArgs};
use crate::config::Config;
use crate::output::RunReport;
use crate::progress::{Progress, ProgressCallback};
use crate::resolve::{read_identifiers, MissingResolver};
use crate::scanner::{FingerprintExtractor, Hasher, ScanReport, TreeScanner};
use crate::verify::CorruptionVerifier;

/// State shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub shutdown: Arc<AtomicBool>,
    pub quiet: bool,
}

impl Context {
    #[must_use]
    pub fn new(config: Config, shutdown: Arc<AtomicBool>, quiet: bool) -> Self {
        Self {
            config,
            shutdown,
            quiet,
        }
    }

    /// Config with the command's CLI overrides applied.
    fn config_for(&self, run: &RunArgs) -> Config {
        let mut config = self.config.clone();
        if let Some(threads) = run.io_threads {
            config.io_threads = usize::from(threads);
        }
        config.follow_symlinks |= run.follow_symlinks;
        config
    }

    fn progress(&self, run: &RunArgs) -> Arc<dyn ProgressCallback> {
        Arc::new(Progress::new(self.quiet || run.output == OutputFormat::Json))
    }
}

/// `index`: build phase only.
///
/// # Errors
///
/// Fails on invalid paths or when the store cannot be opened or saved.
pub fn index(ctx: &Context, args: &IndexArgs) -> Result<RunReport> {
    let root = existing_dir(&args.root, "root")?;
    let config = ctx.config_for(&args.run);
    let mut store = open_store(&root, &config, &args.store)?;
    let scan = build(ctx, &config, &args.run, &root, None, &mut store)?;
    Ok(RunReport::Index { scan })
}

/// `find-missing`: build phase, flush, then resolve phase.
///
/// # Errors
///
/// Fails on invalid paths, an unreadable identifier list, or when the store
/// cannot be opened or saved.
pub fn find_missing(ctx: &Context, args: &FindMissingArgs) -> Result<RunReport> {
    let root = existing_dir(&args.root, "root")?;
    if !args.missing_file.is_file() {
        bail!("missing-file list not found: {}", args.missing_file.display());
    }
    let backup = args
        .backup_path
        .as_deref()
        .map(|dir| existing_dir(dir, "backup path"))
        .transpose()?;
    let lines = read_identifiers(&args.missing_file)?;

    let config = ctx.config_for(&args.run);
    let mut store = open_store(&root, &config, &args.store)?;
    let scan = build(ctx, &config, &args.run, &root, backup.clone(), &mut store)?;
    if scan.interrupted {
        log::warn!("Scan interrupted; skipping the resolve phase");
        return Ok(RunReport::FindMissing { scan, resolve: None });
    }

    let resolve = MissingResolver::new(&store)
        .with_destination(backup)
        .with_progress_callback(ctx.progress(&args.run))
        .resolve(&lines);
    Ok(RunReport::FindMissing {
        scan,
        resolve: Some(resolve),
    })
}

/// `verify`: corruption check of origin-encoded files.
///
/// # Errors
///
/// Fails on invalid paths or when a verification record cannot be written.
pub fn verify(ctx: &Context, args: &VerifyArgs) -> Result<RunReport> {
    let root = existing_dir(&args.root, "root")?;
    let backup = args
        .backup_path
        .as_deref()
        .map(|dir| existing_dir(dir, "backup path"))
        .transpose()?;
    let config = ctx.config_for(&args.run);

    let verifier = CorruptionVerifier::new(
        config.walker_config(backup.clone()),
        config.origin(),
        config.verified_file_name.as_str(),
    )
    .with_derived_dirs(config.derived())
    .with_backup(backup)
    .with_full(args.full)
    .with_io_threads(config.io_threads)
    .with_shutdown_flag(Arc::clone(&ctx.shutdown))
    .with_progress_callback(ctx.progress(&args.run));

    let verify = verifier
        .verify(&root)
        .with_context(|| format!("verification of {} failed", root.display()))?;
    Ok(RunReport::Verify { verify })
}

/// Canonical form of a directory that must already exist.
fn existing_dir(path: &Path, what: &str) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("{what} is not a directory: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("failed to resolve {what} {}", path.display()))
}

fn store_path(root: &Path, config: &Config, args: &StoreArgs) -> PathBuf {
    args.cache
        .clone()
        .unwrap_or_else(|| root.join(&config.cache_file_name))
}

fn open_store(root: &Path, config: &Config, args: &StoreArgs) -> Result<FingerprintStore> {
    let path = store_path(root, config, args);
    let mut store = FingerprintStore::open(&path)
        .with_context(|| format!("failed to open fingerprint store {}", path.display()))?;
    log::debug!(
        "Loaded {} fingerprints ({} scanned files) from {}",
        store.len(),
        store.scanned_len(),
        path.display()
    );
    if args.clear_cache {
        log::info!("Clearing fingerprint store {}", path.display());
        store.clear();
    }
    Ok(store)
}

/// Scan `root` into `store` and commit it, even if the scan was interrupted
/// or hit per-file errors.
fn build(
    ctx: &Context,
    config: &Config,
    run: &RunArgs,
    root: &Path,
    backup: Option<PathBuf>,
    store: &mut FingerprintStore,
) -> Result<ScanReport> {
    let mut walker_config = config.walker_config(backup);
    if let Some(name) = store.path().file_name() {
        walker_config = walker_config.with_ignored_name_prefix(name.to_string_lossy().into_owned());
    }
    let scanner = TreeScanner::new(
        walker_config,
        FingerprintExtractor::new(config.origin(), Hasher::new()),
    )
    .with_io_threads(config.io_threads)
    .with_shutdown_flag(Arc::clone(&ctx.shutdown))
    .with_progress_callback(ctx.progress(run));

    let scan = scanner.scan(root, store);
    let stats = store
        .flush()
        .with_context(|| format!("failed to save fingerprint store {}", store.path().display()))?;
    log::info!(
        "Scanned {} files ({} duplicates); saved {} fingerprints and {} file records",
        scan.files_seen,
        scan.duplicates,
        stats.fingerprints,
        stats.scanned_files
    );
    Ok(scan)
}
