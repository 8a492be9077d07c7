use super::common::{canonical, scanner, sha1, write};
use modsum::cache::{CacheEntry, FingerprintStore};
use modsum::config::Config;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_unflushed_changes_are_not_visible() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("store.db");
    let fp = sha1(b"x");

    let mut store = FingerprintStore::open(&db).unwrap();
    store.insert_or_update(CacheEntry::new(fp, PathBuf::from("/mods/x.png")));
    assert!(store.has_pending_changes());

    let other = FingerprintStore::open(&db).unwrap();
    assert!(other.lookup(&fp).is_none());

    let stats = store.flush().unwrap();
    assert_eq!(stats.fingerprints, 1);
    let other = FingerprintStore::open(&db).unwrap();
    assert_eq!(other.lookup(&fp).unwrap().filename, "x.png");
}

#[test]
fn test_clear_then_flush_empties_store() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.png", b"a");
    let db = dir.path().join("sha1-cache.db");

    let mut store = FingerprintStore::open(&db).unwrap();
    scanner(&Config::default(), None).scan(dir.path(), &mut store);
    store.flush().unwrap();

    let mut store = FingerprintStore::open(&db).unwrap();
    assert_eq!(store.len(), 1);
    store.clear();
    store.flush().unwrap();

    let store = FingerprintStore::open(&db).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.scanned_len(), 0);
}

#[test]
fn test_cleared_store_rescans_everything() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.png", b"a");
    let config = Config::default();
    let mut store = FingerprintStore::in_memory().unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);

    store.clear();
    let report = scanner(&config, None).scan(dir.path(), &mut store);
    assert_eq!(report.files_hashed, 1);
    assert_eq!(report.files_unchanged, 0);
}

#[test]
fn test_overwritten_duplicate_still_counts_as_scanned() {
    let dir = tempdir().unwrap();
    let first = write(dir.path(), "a/dup.png", b"dup");
    write(dir.path(), "b/dup.png", b"dup");
    let mut store = FingerprintStore::in_memory().unwrap();
    scanner(&Config::default(), None).scan(dir.path(), &mut store);

    let first = canonical(&first);
    assert!(store.contains_location(&first));
    assert_ne!(store.lookup(&sha1(b"dup")).unwrap().location, first);
    assert_eq!(store.scan_record(&first).unwrap().fingerprint, sha1(b"dup"));
}
