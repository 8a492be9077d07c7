use super::common::{canonical, origin_name, scanner, sha1, write, STEAM};
use modsum::cache::FingerprintStore;
use modsum::config::Config;
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn snapshot(store: &FingerprintStore) -> BTreeMap<String, (String, String)> {
    store
        .entries()
        .map(|e| {
            (
                e.fingerprint.to_hex(),
                (e.location.display().to_string(), e.filename.clone()),
            )
        })
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut store = FingerprintStore::in_memory().unwrap();

    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);

    assert_eq!(report.files_seen, 0);
    assert_eq!(report.duplicates, 0);
    assert!(store.is_empty());
}

#[test]
fn test_origin_names_are_trusted_without_reading() {
    let dir = tempdir().unwrap();
    // The name claims one fingerprint, the bytes hash to another
    let name = origin_name(b"what the name says", "png");
    write(dir.path(), &format!("Images/{name}"), b"something else entirely");
    write(dir.path(), "Images/local.png", b"plain");

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);

    assert_eq!(report.files_from_name, 1);
    assert_eq!(report.files_hashed, 1);
    let entry = store.lookup(&sha1(b"what the name says")).unwrap();
    assert_eq!(entry.filename, name);
    assert!(store.lookup(&sha1(b"something else entirely")).is_none());
    assert!(store.lookup(&sha1(b"plain")).is_some());
}

#[test]
fn test_duplicates_counted_and_latest_location_wins() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/copy.png", b"same bytes");
    write(dir.path(), "b/copy.obj", b"same bytes");
    write(dir.path(), "c/copy.jpg", b"same bytes");

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);

    assert_eq!(report.files_seen, 3);
    assert_eq!(report.duplicates, 2);
    assert_eq!(store.len(), 1);
    let entry = store.lookup(&sha1(b"same bytes")).unwrap();
    assert_eq!(entry.location, canonical(dir.path()).join("c/copy.jpg"));
}

#[test]
fn test_rebuild_of_unchanged_tree_hashes_nothing() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Images/a.png", b"alpha");
    write(dir.path(), "Images/b.png", b"alpha");
    write(dir.path(), "Models/m.obj", b"mesh");
    write(dir.path(), &format!("Images/{}", origin_name(b"x", "png")), b"x");
    let db = dir.path().join("sha1-cache.db");
    let config = Config::default();

    let mut store = FingerprintStore::open(&db).unwrap();
    let first = scanner(&config, None).scan(dir.path(), &mut store);
    store.flush().unwrap();
    let before = snapshot(&store);
    assert_eq!(first.files_seen, 4);
    assert_eq!(first.files_processed, 4);

    let mut reopened = FingerprintStore::open(&db).unwrap();
    let second = scanner(&config, None).scan(dir.path(), &mut reopened);

    assert_eq!(second.files_seen, 4);
    assert_eq!(second.files_unchanged, 4);
    assert_eq!(second.files_processed, 0);
    assert_eq!(second.files_hashed, 0);
    assert_eq!(second.duplicates, 0);
    assert_eq!(snapshot(&reopened), before);
    assert!(!reopened.has_pending_changes());
}

#[test]
fn test_modified_file_is_fingerprinted_again() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "a.png", b"old");
    let config = Config::default();
    let mut store = FingerprintStore::in_memory().unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);

    fs::write(&path, b"new content").unwrap();
    filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(2_000_000_000, 0)).unwrap();

    let report = scanner(&config, None).scan(dir.path(), &mut store);
    assert_eq!(report.files_hashed, 1);
    assert!(store.lookup(&sha1(b"new content")).is_some());
}

#[test]
fn test_modified_file_no_longer_serves_old_fingerprint() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "a.png", b"one");
    let config = Config::default();
    let mut store = FingerprintStore::in_memory().unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);
    assert!(store.lookup(&sha1(b"one")).is_some());

    fs::write(&path, b"changed size").unwrap();
    let report = scanner(&config, None).scan(dir.path(), &mut store);

    assert_eq!(report.stale_entries, 1);
    assert!(store.lookup(&sha1(b"one")).is_none());
    assert_eq!(store.lookup(&sha1(b"changed size")).unwrap().location, canonical(&path));
}

#[test]
fn test_modified_file_hands_old_fingerprint_to_remaining_copy() {
    let dir = tempdir().unwrap();
    let kept = write(dir.path(), "a/one.png", b"one");
    let changed = write(dir.path(), "b/one.png", b"one");
    let config = Config::default();
    let mut store = FingerprintStore::in_memory().unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);
    assert_eq!(store.lookup(&sha1(b"one")).unwrap().location, canonical(&changed));

    fs::write(&changed, b"something else").unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);

    assert_eq!(store.lookup(&sha1(b"one")).unwrap().location, canonical(&kept));
}

#[test]
fn test_removed_stale_entry_stays_removed_after_reopen() {
    let dir = tempdir().unwrap();
    let db = tempdir().unwrap();
    let db_path = db.path().join("store.db");
    let path = write(dir.path(), "a.png", b"one");
    let config = Config::default();

    let mut store = FingerprintStore::open(&db_path).unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);
    store.flush().unwrap();

    fs::write(&path, b"changed size").unwrap();
    scanner(&config, None).scan(dir.path(), &mut store);
    assert_eq!(store.flush().unwrap().removed, 1);
    drop(store);

    let store = FingerprintStore::open(&db_path).unwrap();
    assert!(store.lookup(&sha1(b"one")).is_none());
    assert!(store.lookup(&sha1(b"changed size")).is_some());
}

#[test]
fn test_raw_directories_are_opaque() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Images Raw/cached.png", b"raw but png");
    write(dir.path(), "Models Raw/nested/deep.obj", b"raw mesh");
    write(dir.path(), "Images/real.png", b"real");

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);

    assert_eq!(report.files_seen, 1);
    assert!(store.lookup(&sha1(b"raw but png")).is_none());
    assert!(store.lookup(&sha1(b"raw mesh")).is_none());
}

#[test]
fn test_raw_directory_names_are_case_sensitive() {
    let dir = tempdir().unwrap();
    write(dir.path(), "images raw/a.png", b"lowercase dir");

    let mut store = FingerprintStore::in_memory().unwrap();
    scanner(&Config::default(), None).scan(dir.path(), &mut store);
    assert!(store.lookup(&sha1(b"lowercase dir")).is_some());
}

#[test]
fn test_ignored_extensions_and_own_files_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Images/a.RAWT", b"ignored");
    write(dir.path(), "Images/b.tmp", b"ignored too");
    write(dir.path(), "Images/.sha1-verified", b"record");
    write(dir.path(), "sha1-cache.db", b"store");
    write(dir.path(), "Images/keep.png", b"keep");

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);
    assert_eq!(report.files_seen, 1);
}

#[test]
fn test_backup_directory_inside_root_is_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Recovered/old.png", b"recovered earlier");
    write(dir.path(), "Images/a.png", b"a");
    let backup = canonical(&dir.path().join("Recovered"));

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), Some(backup)).scan(dir.path(), &mut store);

    assert_eq!(report.files_seen, 1);
    assert!(store.lookup(&sha1(b"recovered earlier")).is_none());
}

#[test]
fn test_names_without_hex_tail_are_hashed() {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("{STEAM}broken.png"), b"content");

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);
    assert_eq!(report.files_hashed, 1);
    assert!(store.lookup(&sha1(b"content")).is_some());
}

#[test]
fn test_interrupted_scan_reports_interruption() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.png", b"a");

    let mut store = FingerprintStore::in_memory().unwrap();
    let report = scanner(&Config::default(), None)
        .with_shutdown_flag(Arc::new(AtomicBool::new(true)))
        .scan(dir.path(), &mut store);
    assert!(report.interrupted);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_does_not_abort_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = write(dir.path(), "a/locked.png", b"secret");
    write(dir.path(), "b/open.png", b"open");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        // Running with privileges that ignore permissions
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let db = dir.path().join("sha1-cache.db");
    let mut store = FingerprintStore::open(&db).unwrap();
    let report = scanner(&Config::default(), None).scan(dir.path(), &mut store);
    store.flush().unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path.ends_with("a/locked.png"));
    let reopened = FingerprintStore::open(&db).unwrap();
    assert!(reopened.lookup(&sha1(b"open")).is_some());
}
