//! Command-line interface definitions for modsum.
//!
//! # Example
//!
//! ```bash
//! # Build (or refresh) the fingerprint store for a mod cache
//! modsum index ~/Documents/My\ Games/Tabletop\ Simulator/Mods
//!
//! # Recover files listed in missing.txt into ./recovered
//! modsum find-missing ./Mods missing.txt --backup-path ./recovered
//!
//! # Check origin-encoded files and move corrupt ones aside
//! modsum verify ./Mods -b ./corrupt
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Integrity checking and recovery for content-addressed mod caches.
///
/// Files whose names embed a SHA-1 fingerprint are verified against their
/// content. Any file in the tree can satisfy a missing fingerprint.
#[derive(Debug, Parser)]
#[command(name = "modsum")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a tree and update the fingerprint store
    Index(IndexArgs),
    /// Scan a tree, then recover files listed as missing
    FindMissing(FindMissingArgs),
    /// Re-hash origin-encoded files and quarantine corrupt ones
    Verify(VerifyArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Output format for the final report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Number of I/O threads for hashing (overrides the config file)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,

    /// Follow symbolic links during the scan
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Fingerprint store options.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Path to the fingerprint store (default: <ROOT>/sha1-cache.db)
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Empty the fingerprint store before scanning
    #[arg(long)]
    pub clear_cache: bool,
}

/// Arguments for the index subcommand.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Root of the tree to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the find-missing subcommand.
#[derive(Debug, Args)]
pub struct FindMissingArgs {
    /// Root of the tree to scan
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Text file with one URL-like identifier per line
    #[arg(value_name = "MISSING_FILE")]
    pub missing_file: PathBuf,

    /// Directory recovered copies are written to (excluded from the scan)
    #[arg(short, long, value_name = "DIR")]
    pub backup_path: Option<PathBuf>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the verify subcommand.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Root of the tree to verify
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Directory corrupt files are moved to (excluded from the scan)
    ///
    /// Without it, corrupt files are reported and left in place.
    #[arg(short, long, value_name = "DIR")]
    pub backup_path: Option<PathBuf>,

    /// Re-hash every file, ignoring earlier verification records
    #[arg(long)]
    pub full: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
