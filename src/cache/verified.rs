//! Per-directory record of files already verified as intact.
//!
//! The record is a plain text file inside the directory it describes, one
//! filename per line. It is rewritten through a temporary file in the same
//! directory and renamed into place, so a failed write never truncates the
//! previous record.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;

use super::database::{StoreError, StoreResult};

/// Filenames in one directory known to match their embedded fingerprint.
#[derive(Debug, Clone)]
pub struct VerifiedSet {
    path: PathBuf,
    names: BTreeSet<String>,
    /// Modification time of the record file when it was loaded.
    recorded_at: Option<SystemTime>,
    dirty: bool,
}

impl VerifiedSet {
    /// An empty set that will be stored at `dir/file_name`.
    #[must_use]
    pub fn empty(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
            names: BTreeSet::new(),
            recorded_at: None,
            dirty: false,
        }
    }

    /// Load the set for `dir`; a missing record yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the record exists but cannot be read.
    pub fn load(dir: &Path, file_name: &str) -> StoreResult<Self> {
        let mut set = Self::empty(dir, file_name);
        let content = match fs::read_to_string(&set.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(set),
            Err(source) => {
                return Err(StoreError::Io {
                    path: set.path,
                    source,
                })
            }
        };

        set.names = content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        set.recorded_at = fs::metadata(&set.path).and_then(|m| m.modified()).ok();
        Ok(set)
    }

    /// Where the record is stored.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether `name` can be skipped: it is listed and has not been modified
    /// since the record was last written.
    #[must_use]
    pub fn is_verified(&self, name: &str, modified: SystemTime) -> bool {
        self.contains(name)
            && self
                .recorded_at
                .is_none_or(|recorded_at| modified <= recorded_at)
    }

    pub fn insert(&mut self, name: &str) {
        if self.names.insert(name.to_string()) {
            self.dirty = true;
        }
    }

    /// Remove a name; returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.names.remove(name);
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Keep only names for which `keep` returns true.
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        let before = self.names.len();
        self.names.retain(|name| keep(name));
        if self.names.len() != before {
            self.dirty = true;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the set if it changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the temporary file cannot be written or
    /// renamed over the record.
    pub fn persist(&mut self) -> StoreResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        for name in &self.names {
            writeln!(tmp, "{name}").map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        self.recorded_at = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        self.dirty = false;
        log::trace!("Wrote {} verified names to {}", self.names.len(), self.path.display());
        Ok(())
    }
}
