use super::common::{canonical, origin_name, scanner, sha1, write};
use modsum::cache::FingerprintStore;
use modsum::config::Config;
use modsum::resolve::{read_identifiers, DesiredIdentifier, MissingResolver};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const WANTED: &str =
    "http://cloud-3.steamusercontent.com/ugc/123/D6644503664E262C9C0B610A39C9AB2E98AC599C/";

fn build(root: &Path, db: &Path) -> FingerprintStore {
    let mut store = FingerprintStore::open(db).unwrap();
    scanner(&Config::default(), None).scan(root, &mut store);
    store.flush().unwrap();
    // Resolve against what was committed, not the in-memory view
    FingerprintStore::open(db).unwrap()
}

fn url_for(content: &[u8]) -> String {
    format!("http://cloud-3.steamusercontent.com/ugc/99/{}/", sha1(content))
}

#[test]
fn test_identifier_fingerprint_and_recovery_name() {
    let id = DesiredIdentifier::parse(WANTED).unwrap();
    assert_eq!(
        id.fingerprint().to_hex(),
        "D6644503664E262C9C0B610A39C9AB2E98AC599C"
    );
    assert_eq!(
        id.recovery_file_name(Path::new("Mods/Images/whatever.png")),
        "httpcloud3steamusercontentcomugc123D6644503664E262C9C0B610A39C9AB2E98AC599C.png"
    );
}

#[test]
fn test_missing_file_recovered_from_renamed_copy() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    // The wanted file survives under an unrelated local name
    write(dir.path(), "Images/renamed by hand.jpg", b"texture bytes");
    let store = build(dir.path(), &dir.path().join("sha1-cache.db"));

    let missing = url_for(b"texture bytes");
    let report = MissingResolver::new(&store)
        .with_destination(Some(canonical(out.path())))
        .resolve([missing.as_str()]);

    assert_eq!(report.resolved, 1);
    assert_eq!(report.copied, 1);
    let expected = format!("httpcloud3steamusercontentcomugc99{}.jpg", sha1(b"texture bytes"));
    assert_eq!(fs::read(out.path().join(expected)).unwrap(), b"texture bytes");
}

#[test]
fn test_origin_named_file_satisfies_lowercase_identifier() {
    let dir = tempdir().unwrap();
    let name = origin_name(b"model", "obj");
    write(dir.path(), &format!("Models/{name}"), b"model");
    let store = build(dir.path(), &dir.path().join("sha1-cache.db"));

    let missing = url_for(b"model").to_lowercase();
    let report = MissingResolver::new(&store).resolve([missing.as_str()]);
    assert_eq!(report.resolved, 1);
    assert!(report.matches[0].recovery_name.ends_with(".obj"));
    assert!(report.matches[0].source.ends_with(&name));
}

#[test]
fn test_unresolved_identifiers_have_no_side_effects() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    write(dir.path(), "Images/a.png", b"a");
    let store = build(dir.path(), &dir.path().join("sha1-cache.db"));

    let report = MissingResolver::new(&store)
        .with_destination(Some(out.path().to_path_buf()))
        .resolve([WANTED]);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.still_missing, vec![WANTED.trim_end_matches('/').to_string()]);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_stale_location_fails_copy_but_continues() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let moved = write(dir.path(), "Images/moved.png", b"moved later");
    write(dir.path(), "Images/stays.png", b"stays");
    let store = build(dir.path(), &dir.path().join("sha1-cache.db"));
    fs::remove_file(moved).unwrap();

    let first = url_for(b"moved later");
    let second = url_for(b"stays");
    let report = MissingResolver::new(&store)
        .with_destination(Some(out.path().to_path_buf()))
        .resolve([first.as_str(), second.as_str()]);

    assert_eq!(report.resolved, 2);
    assert_eq!(report.copy_failed, 1);
    assert_eq!(report.copied, 1);
}

#[test]
fn test_missing_list_file_with_blank_and_bad_lines() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Images/a.png", b"a");
    let store = build(dir.path(), &dir.path().join("sha1-cache.db"));

    let list = dir.path().join("missing.txt");
    fs::write(&list, format!("{}\n\n   \nnot a fingerprint\n{WANTED}\n", url_for(b"a"))).unwrap();
    let lines = read_identifiers(&list).unwrap();

    let report = MissingResolver::new(&store).resolve(&lines);
    assert_eq!(report.total, 3);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.invalid, 1);
}

#[test]
fn test_recovered_copies_inside_root_are_not_rescanned() {
    let dir = tempdir().unwrap();
    let recovered = dir.path().join("Recovered");
    fs::create_dir(&recovered).unwrap();
    let backup = canonical(&recovered);
    write(dir.path(), "Images/a.png", b"a");
    let db = dir.path().join("sha1-cache.db");

    let mut store = FingerprintStore::open(&db).unwrap();
    scanner(&Config::default(), Some(backup.clone())).scan(dir.path(), &mut store);
    store.flush().unwrap();
    let missing = url_for(b"a");
    MissingResolver::new(&store)
        .with_destination(Some(backup.clone()))
        .resolve([missing.as_str()]);
    assert_eq!(fs::read_dir(&backup).unwrap().count(), 1);

    let report = scanner(&Config::default(), Some(backup)).scan(dir.path(), &mut store);
    assert_eq!(report.files_seen, 1);
    assert_eq!(report.duplicates, 0);
}

#[test]
fn test_overwritten_file_is_not_recovered_under_old_fingerprint() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let db = dir.path().join("sha1-cache.db");
    let path = write(dir.path(), "a.png", b"one");
    build(dir.path(), &db);

    fs::write(&path, b"changed size").unwrap();
    let store = build(dir.path(), &db);

    let missing = url_for(b"one");
    let report = MissingResolver::new(&store)
        .with_destination(Some(canonical(out.path())))
        .resolve([missing.as_str()]);

    assert_eq!(report.resolved, 0);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.copied, 0);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
