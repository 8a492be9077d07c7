//! SQLite-backed fingerprint store.
//!
//! The store is loaded into memory when opened. Mutations are buffered and
//! written by [`FingerprintStore::flush`] inside a single transaction, so the
//! on-disk store only ever holds fully committed scans.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rusqlite::{params, Connection, OptionalExtension};

use super::entry::{location_key, CacheEntry, ScanRecord};
use crate::scanner::{Fingerprint, FingerprintError};

/// Bumped whenever the table layout changes; older stores are reset.
pub const SCHEMA_VERSION: i64 = 1;

/// Errors raised by the fingerprint store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The SQLite layer failed.
    #[error("fingerprint store error at {path}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A row held a value that is not a fingerprint.
    #[error("corrupt fingerprint in store at {path}: {source}")]
    CorruptRow {
        path: PathBuf,
        #[source]
        source: FingerprintError,
    },

    /// A plain file backing a store could not be read or written.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Counts written by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub fingerprints: usize,
    pub removed: usize,
    pub scanned_files: usize,
}

/// Persistent mapping from fingerprint to the most recently scanned file.
///
/// Besides the one-entry-per-fingerprint table the store keeps a record of
/// every scanned location, so files whose entry was taken over by a later
/// duplicate are still recognised and not hashed again.
pub struct FingerprintStore {
    conn: Connection,
    path: PathBuf,
    entries: HashMap<Fingerprint, CacheEntry>,
    scanned: HashMap<PathBuf, ScanRecord>,
    dirty_entries: HashSet<Fingerprint>,
    dirty_scanned: HashSet<PathBuf>,
    cleared: bool,
}

impl std::fmt::Debug for FingerprintStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintStore")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .field("scanned", &self.scanned.len())
            .field("pending", &(self.dirty_entries.len() + self.dirty_scanned.len()))
            .finish()
    }
}

impl FingerprintStore {
    /// Open or create a store at `path` and load its contents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened, migrated or
    /// read.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| sqlite_err(path, e))?;
        Self::from_connection(conn, path.to_path_buf())
    }

    /// Create a store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if SQLite cannot set up the schema.
    pub fn in_memory() -> StoreResult<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| sqlite_err(&path, e))?;
        Self::from_connection(conn, path)
    }

    fn from_connection(conn: Connection, path: PathBuf) -> StoreResult<Self> {
        let mut store = Self {
            conn,
            path,
            entries: HashMap::new(),
            scanned: HashMap::new(),
            dirty_entries: HashSet::new(),
            dirty_scanned: HashSet::new(),
            cleared: false,
        };
        store.init_schema()?;
        store.load()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS meta (
                     key   TEXT PRIMARY KEY,
                     value TEXT NOT NULL
                 );",
            )
            .map_err(|e| sqlite_err(&self.path, e))?;

        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| sqlite_err(&self.path, e))?;

        if version.as_deref() != Some(SCHEMA_VERSION.to_string().as_str()) {
            if version.is_some() {
                log::warn!(
                    "Fingerprint store {} has schema {:?}, expected {}; resetting",
                    self.path.display(),
                    version,
                    SCHEMA_VERSION
                );
            }
            self.conn
                .execute_batch(
                    "DROP TABLE IF EXISTS fingerprints;
                     DROP TABLE IF EXISTS scanned_files;",
                )
                .map_err(|e| sqlite_err(&self.path, e))?;
        }

        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS fingerprints (
                     fingerprint TEXT PRIMARY KEY,
                     location    TEXT NOT NULL,
                     filename    TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS scanned_files (
                     location    TEXT PRIMARY KEY,
                     fingerprint TEXT NOT NULL,
                     filename    TEXT NOT NULL,
                     size        INTEGER NOT NULL,
                     mtime_ns    INTEGER NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_scanned_files_filename
                     ON scanned_files(filename);",
            )
            .map_err(|e| sqlite_err(&self.path, e))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO meta(key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )
            .map_err(|e| sqlite_err(&self.path, e))?;
        Ok(())
    }

    /// Replace the in-memory view with the committed on-disk state.
    ///
    /// Pending changes are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a table cannot be read or holds a malformed
    /// fingerprint.
    pub fn load(&mut self) -> StoreResult<()> {
        let path = self.path.clone();
        let mut entries = HashMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT fingerprint, location, filename FROM fingerprints")
                .map_err(|e| sqlite_err(&path, e))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| sqlite_err(&path, e))?;
            for row in rows {
                let (fp, location, filename) = row.map_err(|e| sqlite_err(&path, e))?;
                let fingerprint = parse_row_fingerprint(&path, &fp)?;
                entries.insert(
                    fingerprint,
                    CacheEntry {
                        fingerprint,
                        location: PathBuf::from(location),
                        filename,
                    },
                );
            }
        }

        let mut scanned = HashMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT location, fingerprint, filename, size, mtime_ns FROM scanned_files")
                .map_err(|e| sqlite_err(&path, e))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })
                .map_err(|e| sqlite_err(&path, e))?;
            for row in rows {
                let (location, fp, filename, size, mtime_ns) =
                    row.map_err(|e| sqlite_err(&path, e))?;
                let fingerprint = parse_row_fingerprint(&path, &fp)?;
                scanned.insert(
                    PathBuf::from(location),
                    ScanRecord {
                        fingerprint,
                        filename,
                        size: u64::try_from(size).unwrap_or(0),
                        mtime_ns,
                    },
                );
            }
        }

        log::debug!(
            "Loaded fingerprint store {}: {} fingerprints, {} scanned files",
            path.display(),
            entries.len(),
            scanned.len()
        );

        self.entries = entries;
        self.scanned = scanned;
        self.dirty_entries.clear();
        self.dirty_scanned.clear();
        self.cleared = false;
        Ok(())
    }

    /// Where the store lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the entry for a fingerprint.
    #[must_use]
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(fingerprint)
    }

    /// Record a fingerprint, overwriting any existing entry.
    ///
    /// Returns `true` when an entry for the fingerprint already existed. The
    /// newest location always wins so the store tracks files that currently
    /// exist rather than ones since moved.
    pub fn insert_or_update(&mut self, entry: CacheEntry) -> bool {
        let fingerprint = entry.fingerprint;
        let duplicate = self.entries.insert(fingerprint, entry).is_some();
        self.dirty_entries.insert(fingerprint);
        duplicate
    }

    /// Remove the entry for a fingerprint; the row is deleted by the next
    /// flush.
    pub fn remove(&mut self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let removed = self.entries.remove(fingerprint)?;
        self.dirty_entries.insert(*fingerprint);
        Some(removed)
    }

    /// Stop `location` providing the fingerprint it had when last scanned.
    ///
    /// Call before recording a changed file. `current` is its new
    /// fingerprint, or `None` if it could not be read. If the entry for the
    /// old fingerprint points at `location` it is moved to another scanned
    /// file with that fingerprint, or removed when there is none. Returns
    /// the old fingerprint when its entry was touched.
    pub fn release_location(
        &mut self,
        location: &Path,
        current: Option<Fingerprint>,
    ) -> Option<Fingerprint> {
        let previous = self.scan_record(location)?.fingerprint;
        if Some(previous) == current {
            return None;
        }
        if self.lookup(&previous)?.location != location {
            return None;
        }

        let replacement = self
            .scanned
            .iter()
            .filter(|(other, record)| record.fingerprint == previous && other.as_path() != location)
            .map(|(other, _)| other)
            .max()
            .cloned();
        match replacement {
            Some(other) => {
                log::debug!(
                    "{} changed; {} now served by {}",
                    location.display(),
                    previous,
                    other.display()
                );
                self.insert_or_update(CacheEntry::new(previous, other));
            }
            None => {
                log::debug!("{} changed; dropping {}", location.display(), previous);
                self.remove(&previous);
            }
        }
        Some(previous)
    }

    /// Record that `location` has been scanned.
    pub fn record_scan(&mut self, location: &Path, record: ScanRecord) {
        self.scanned.insert(location.to_path_buf(), record);
        self.dirty_scanned.insert(location.to_path_buf());
    }

    /// Whether a file at `location` has been scanned before.
    #[must_use]
    pub fn contains_location(&self, location: &Path) -> bool {
        self.scanned.contains_key(location)
    }

    /// Whether `location` was scanned and still has the recorded size and
    /// modification time.
    #[must_use]
    pub fn is_current(&self, location: &Path, size: u64, modified: SystemTime) -> bool {
        self.scanned
            .get(location)
            .is_some_and(|record| record.matches(size, modified))
    }

    /// The scan record for a location.
    #[must_use]
    pub fn scan_record(&self, location: &Path) -> Option<&ScanRecord> {
        self.scanned.get(location)
    }

    /// Number of fingerprints held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no fingerprints are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of scanned locations held.
    #[must_use]
    pub fn scanned_len(&self) -> usize {
        self.scanned.len()
    }

    /// Whether there are changes not yet flushed.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.cleared || !self.dirty_entries.is_empty() || !self.dirty_scanned.is_empty()
    }

    /// Iterate over all entries in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// Drop everything; the on-disk tables are emptied by the next flush.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.scanned.clear();
        self.dirty_entries.clear();
        self.dirty_scanned.clear();
        self.cleared = true;
    }

    /// Write all pending changes in one transaction.
    ///
    /// On error nothing is committed and the pending changes are kept, so
    /// the previous on-disk state remains intact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the transaction fails.
    pub fn flush(&mut self) -> StoreResult<FlushStats> {
        if !self.has_pending_changes() {
            return Ok(FlushStats::default());
        }

        let path = self.path.clone();
        let tx = self.conn.transaction().map_err(|e| sqlite_err(&path, e))?;

        if self.cleared {
            tx.execute_batch("DELETE FROM fingerprints; DELETE FROM scanned_files;")
                .map_err(|e| sqlite_err(&path, e))?;
        }

        let mut stats = FlushStats::default();
        {
            let mut upsert = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO fingerprints(fingerprint, location, filename)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| sqlite_err(&path, e))?;
            let mut delete = tx
                .prepare_cached("DELETE FROM fingerprints WHERE fingerprint = ?1")
                .map_err(|e| sqlite_err(&path, e))?;
            for fingerprint in &self.dirty_entries {
                match self.entries.get(fingerprint) {
                    Some(entry) => {
                        upsert
                            .execute(params![
                                fingerprint.to_hex(),
                                location_key(&entry.location),
                                entry.filename
                            ])
                            .map_err(|e| sqlite_err(&path, e))?;
                        stats.fingerprints += 1;
                    }
                    None => {
                        stats.removed += delete
                            .execute(params![fingerprint.to_hex()])
                            .map_err(|e| sqlite_err(&path, e))?;
                    }
                }
            }
        }
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO scanned_files(location, fingerprint, filename, size, mtime_ns)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| sqlite_err(&path, e))?;
            for location in &self.dirty_scanned {
                if let Some(record) = self.scanned.get(location) {
                    stmt.execute(params![
                        location_key(location),
                        record.fingerprint.to_hex(),
                        record.filename,
                        i64::try_from(record.size).unwrap_or(i64::MAX),
                        record.mtime_ns
                    ])
                    .map_err(|e| sqlite_err(&path, e))?;
                    stats.scanned_files += 1;
                }
            }
        }

        tx.commit().map_err(|e| sqlite_err(&path, e))?;

        self.dirty_entries.clear();
        self.dirty_scanned.clear();
        self.cleared = false;
        log::debug!(
            "Flushed fingerprint store {}: {} fingerprints, {} removed, {} scanned files",
            path.display(),
            stats.fingerprints,
            stats.removed,
            stats.scanned_files
        );
        Ok(stats)
    }
}

fn sqlite_err(path: &Path, source: rusqlite::Error) -> StoreError {
    StoreError::Sqlite {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_row_fingerprint(path: &Path, text: &str) -> StoreResult<Fingerprint> {
    Fingerprint::parse_hex(text).map_err(|source| StoreError::CorruptRow {
        path: path.to_path_buf(),
        source,
    })
}
