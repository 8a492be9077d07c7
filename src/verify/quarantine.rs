//! Relocation of corrupted assets and the artifacts derived from them.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::actions::move_into;

/// A directory of files mechanically derived from source assets.
///
/// A source `<stem>.<ext>` has its derived file at
/// `<root>/<name>/<stem>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedDir {
    pub name: String,
    pub extension: String,
}

impl DerivedDir {
    #[must_use]
    pub fn new(name: impl Into<String>, extension: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            extension: extension.as_ref().trim_start_matches('.').to_string(),
        }
    }

    /// Path the derived artifact for `source_name` would have.
    #[must_use]
    pub fn artifact_path(&self, root: &Path, source_name: &str) -> PathBuf {
        let stem = Path::new(source_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_name.to_string());
        root.join(&self.name)
            .join(format!("{stem}.{}", self.extension))
    }
}

/// What happened to one quarantined path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Disposition {
    /// Moved to the backup directory.
    Moved { to: PathBuf },
    /// Reported only; no backup directory was configured.
    Reported,
    /// The move failed; the file is still in place.
    Failed { error: String },
}

/// One path handled by a quarantine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantinedFile {
    pub path: PathBuf,
    pub derived: bool,
    #[serde(flatten)]
    pub disposition: Disposition,
}

/// Moves corrupted files, and any derived artifacts that exist for them,
/// out of the active tree.
#[derive(Debug, Clone)]
pub struct Quarantine {
    root: PathBuf,
    destination: Option<PathBuf>,
    derived_dirs: Vec<DerivedDir>,
}

impl Quarantine {
    #[must_use]
    pub fn new(root: PathBuf, destination: Option<PathBuf>, derived_dirs: Vec<DerivedDir>) -> Self {
        Self {
            root,
            destination,
            derived_dirs,
        }
    }

    /// Derived artifacts that currently exist for a source filename.
    #[must_use]
    pub fn derived_artifacts(&self, source_name: &str) -> Vec<PathBuf> {
        self.derived_dirs
            .iter()
            .map(|dir| dir.artifact_path(&self.root, source_name))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Quarantine a corrupted file, then its derived artifacts.
    ///
    /// The first element of the result is always the file itself.
    pub fn quarantine(&self, path: &Path) -> Vec<QuarantinedFile> {
        let mut handled = vec![QuarantinedFile {
            path: path.to_path_buf(),
            derived: false,
            disposition: self.relocate(path),
        }];

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for artifact in self.derived_artifacts(&name) {
            log::warn!("  derived artifact from corrupt source: {}", artifact.display());
            let disposition = self.relocate(&artifact);
            handled.push(QuarantinedFile {
                path: artifact,
                derived: true,
                disposition,
            });
        }
        handled
    }

    fn relocate(&self, path: &Path) -> Disposition {
        let Some(destination) = &self.destination else {
            return Disposition::Reported;
        };
        match move_into(path, destination) {
            Ok(moved) => Disposition::Moved { to: moved.to },
            Err(e) => {
                log::warn!("Failed to quarantine {}: {}", path.display(), e);
                Disposition::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
