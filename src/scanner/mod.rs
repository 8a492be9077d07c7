//! Scanner module for directory traversal and fingerprinting.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk, with excluded subtrees pruned
//! - Fingerprint extraction (from origin-encoded names or SHA-1 of content)
//! - The build phase that populates the fingerprint store
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: SHA-1 file hashing (streaming)
//! - [`fingerprint`]: Fingerprint type and extraction strategy
//! - [`indexer`]: Tree scanner feeding the fingerprint store
//!
//! # Example
//!
//! ```no_run
//! use modsum::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::default()
//!     .with_ignored_extensions(["rawt", "rawm", "tmp"])
//!     .with_excluded_dir_names(["Images Raw", "Models Raw"]);
//!
//! let walker = Walker::new(Path::new("Mods"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod fingerprint;
pub mod hasher;
pub mod indexer;
pub mod walker;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Re-export main types
pub use fingerprint::{
    Extracted, Fingerprint, FingerprintError, FingerprintExtractor, FingerprintSource,
    OriginPattern, Strategy, FINGERPRINT_HEX_LEN,
};
pub use hasher::Hasher;
pub use indexer::{ScanReport, TreeScanner};
pub use walker::Walker;

/// Metadata for a discovered file.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path to the file (under the canonicalized root)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }

    /// The file's base name, lossily converted to UTF-8.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Configuration for directory walking.
///
/// Controls which subtrees and files are skipped.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Directory base names whose whole subtree is skipped (case-sensitive).
    pub excluded_dir_names: HashSet<String>,

    /// A directory skipped with its subtree, compared case-insensitively.
    pub excluded_path: Option<PathBuf>,

    /// File extensions to skip, lowercase and without the leading dot.
    pub ignored_extensions: HashSet<String>,

    /// Files whose name starts with one of these are skipped.
    /// Used for the tool's own store and verified-set files.
    pub ignored_name_prefixes: Vec<String>,
}

impl WalkerConfig {
    /// Set the excluded directory names.
    #[must_use]
    pub fn with_excluded_dir_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dir_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the excluded directory path.
    #[must_use]
    pub fn with_excluded_path(mut self, path: Option<PathBuf>) -> Self {
        self.excluded_path = path;
        self
    }

    /// Set the ignored extensions; a leading dot and case are dropped.
    #[must_use]
    pub fn with_ignored_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Add a filename prefix to skip.
    #[must_use]
    pub fn with_ignored_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_name_prefixes.push(prefix.into());
        self
    }

    /// Set whether symlinks are followed.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Whether a file is ineligible by extension or name prefix.
    #[must_use]
    pub fn is_ignored_file(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.ignored_extensions.contains(&ext) {
                return true;
            }
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.ignored_name_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Hashing a discovered file failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::Io { path, .. } => path,
            Self::Hash(e) => e.path(),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
