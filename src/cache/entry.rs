//! Cache entry definitions.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::scanner::{FileEntry, Fingerprint};

/// The retained location for one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Fingerprint this entry answers for.
    pub fingerprint: Fingerprint,
    /// Where the file was when it was scanned.
    pub location: PathBuf,
    /// Base name of the file at scan time.
    pub filename: String,
}

impl CacheEntry {
    /// Create an entry for a file at `location`.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, location: PathBuf) -> Self {
        let filename = location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            fingerprint,
            location,
            filename,
        }
    }

    /// Extension of the stored location, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.location
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }
}

/// A record of one scanned file, kept even after its fingerprint entry has
/// been taken over by a later duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_ns: i64,
}

impl ScanRecord {
    /// Build a record for a walked file.
    #[must_use]
    pub fn for_file(fingerprint: Fingerprint, file: &FileEntry) -> Self {
        Self {
            fingerprint,
            filename: file.file_name(),
            size: file.size,
            mtime_ns: mtime_ns(file.modified),
        }
    }

    /// Whether the file on disk still looks like the one that was scanned.
    #[must_use]
    pub fn matches(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.mtime_ns == mtime_ns(modified)
    }
}

/// Convert a modification time to nanoseconds since the epoch.
///
/// Times before the epoch clamp to zero and far-future times to `i64::MAX`.
#[must_use]
pub fn mtime_ns(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Text key used for a location in the store.
#[must_use]
pub fn location_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
