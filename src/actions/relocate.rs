//! Copy and move primitives used by recovery and quarantine.
//!
//! # Overview
//!
//! - [`copy_file`] writes the copy to a temporary file in the destination
//!   directory and renames it into place, so a failed copy never leaves a
//!   partial file under the final name.
//! - [`move_into`] renames a file into a directory, preserving its name, and
//!   falls back to copy-then-remove when the rename fails (for example
//!   across filesystems).

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Error type for relocation operations.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The source file does not exist (it may have moved since it was scanned).
    #[error("source not found: {0}")]
    SourceNotFound(PathBuf),

    /// The source path has no final component to preserve.
    #[error("source has no file name: {0}")]
    NoFileName(PathBuf),

    /// The destination directory does not exist or is not a directory.
    #[error("destination is not a directory: {0}")]
    DestinationNotADirectory(PathBuf),

    /// Copying the bytes failed.
    #[error("copy {from} -> {to} failed: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was copied but the original could not be removed.
    #[error("copied {from} but could not remove it: {source}")]
    RemoveSource {
        from: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RelocateError {
    /// The path the failure is reported against.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::SourceNotFound(p) | Self::NoFileName(p) | Self::DestinationNotADirectory(p) => p,
            Self::Copy { from, .. } | Self::RemoveSource { from, .. } => from,
        }
    }
}

/// Result of a completed relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    pub from: PathBuf,
    pub to: PathBuf,
    pub bytes: u64,
}

/// Copy `from` to the exact path `to`, replacing any existing file.
///
/// # Errors
///
/// Returns [`RelocateError`] if the source is missing, the destination's
/// parent is not a directory, or any I/O step fails.
pub fn copy_file(from: &Path, to: &Path) -> Result<Relocated, RelocateError> {
    let parent = to
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        return Err(RelocateError::DestinationNotADirectory(parent.to_path_buf()));
    }

    let copy_err = |source: io::Error| {
        if source.kind() == io::ErrorKind::NotFound && !from.exists() {
            RelocateError::SourceNotFound(from.to_path_buf())
        } else {
            RelocateError::Copy {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            }
        }
    };

    let mut source = File::open(from).map_err(copy_err)?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(copy_err)?;
    let bytes = io::copy(&mut source, &mut tmp).map_err(copy_err)?;
    tmp.as_file().sync_all().map_err(copy_err)?;
    tmp.persist(to).map_err(|e| copy_err(e.error))?;

    log::debug!("Copied {} -> {}", from.display(), to.display());
    Ok(Relocated {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        bytes,
    })
}

/// Move `from` into `dir`, keeping its file name.
///
/// # Errors
///
/// Returns [`RelocateError`] if the source is missing, `dir` is not a
/// directory, or both the rename and the copy fallback fail.
pub fn move_into(from: &Path, dir: &Path) -> Result<Relocated, RelocateError> {
    let name = from
        .file_name()
        .ok_or_else(|| RelocateError::NoFileName(from.to_path_buf()))?;
    if !dir.is_dir() {
        return Err(RelocateError::DestinationNotADirectory(dir.to_path_buf()));
    }
    let metadata = fs::metadata(from).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RelocateError::SourceNotFound(from.to_path_buf()),
        _ => RelocateError::Copy {
            from: from.to_path_buf(),
            to: dir.to_path_buf(),
            source: e,
        },
    })?;
    let to = dir.join(name);

    match fs::rename(from, &to) {
        Ok(()) => {
            log::debug!("Moved {} -> {}", from.display(), to.display());
            Ok(Relocated {
                from: from.to_path_buf(),
                to,
                bytes: metadata.len(),
            })
        }
        Err(e) => {
            log::debug!(
                "Rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                e
            );
            let copied = copy_file(from, &to)?;
            fs::remove_file(from).map_err(|source| RelocateError::RemoveSource {
                from: from.to_path_buf(),
                source,
            })?;
            Ok(copied)
        }
    }
}
