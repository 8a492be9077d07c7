use super::common::{canonical, origin_name, sha1, write, STEAM};
use modsum::cache::VerifiedSet;
use modsum::config::Config;
use modsum::verify::{CorruptionVerifier, Disposition};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

const RECORD: &str = ".sha1-verified";

fn verifier(backup: Option<PathBuf>) -> CorruptionVerifier {
    let config = Config::default();
    CorruptionVerifier::new(
        config.walker_config(backup.clone()),
        config.origin(),
        config.verified_file_name.as_str(),
    )
    .with_derived_dirs(config.derived())
    .with_backup(backup)
    .with_io_threads(2)
}

#[test]
fn test_crafted_mismatch_is_flagged() {
    let dir = tempdir().unwrap();
    let good = origin_name(b"good", "png");
    let bad = origin_name(b"expected", "png");
    write(dir.path(), &format!("Images/{good}"), b"good");
    write(dir.path(), &format!("Images/{bad}"), b"tampered");

    let report = verifier(None).verify(dir.path()).unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.verified, 1);
    assert_eq!(report.corrupted, 1);
    let corrupt = &report.corrupted_files[0];
    assert!(corrupt.path.ends_with(&bad));
    assert_eq!(corrupt.expected, sha1(b"expected"));
    assert_eq!(corrupt.actual, sha1(b"tampered"));
}

#[test]
fn test_quarantine_moves_file_and_derived_artifact() {
    let dir = tempdir().unwrap();
    let backup_dir = tempdir().unwrap();
    let backup = canonical(backup_dir.path());

    let name = format!("{STEAM}X{}.png", sha1(b"original"));
    let stem = name.trim_end_matches(".png").to_string();
    let source = write(dir.path(), &format!("Images/{name}"), b"corrupted");
    let derived = write(dir.path(), &format!("Images Raw/{stem}.rawt"), b"derived from bad data");
    let unrelated = write(dir.path(), "Models Raw/other.rawm", b"untouched");

    let report = verifier(Some(backup.clone())).verify(dir.path()).unwrap();

    assert_eq!(report.corrupted, 1);
    assert_eq!(report.derived_quarantined, 1);
    assert!(!source.exists());
    assert!(!derived.exists());
    assert!(unrelated.exists());
    assert_eq!(fs::read(backup.join(&name)).unwrap(), b"corrupted");
    assert_eq!(fs::read(backup.join(format!("{stem}.rawt"))).unwrap(), b"derived from bad data");

    let handled = &report.corrupted_files[0].quarantined;
    assert_eq!(handled.len(), 2);
    assert!(!handled[0].derived);
    assert!(handled[1].derived);
    assert!(handled
        .iter()
        .all(|q| matches!(q.disposition, Disposition::Moved { .. })));
}

#[test]
fn test_without_backup_corrupt_files_stay() {
    let dir = tempdir().unwrap();
    let name = origin_name(b"original", "obj");
    let source = write(dir.path(), &format!("Models/{name}"), b"corrupted");

    let report = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(report.corrupted, 1);
    assert!(source.exists());
    assert_eq!(
        report.corrupted_files[0].quarantined[0].disposition,
        Disposition::Reported
    );
}

#[test]
fn test_verified_set_short_circuits_second_pass() {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("Images/{}", origin_name(b"a", "png")), b"a");
    write(dir.path(), &format!("Images/{}", origin_name(b"b", "png")), b"b");

    let first = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(first.verified, 2);
    assert_eq!(first.skipped, 0);

    let second = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(second.verified, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.corrupted, 0);
}

#[test]
fn test_listed_file_is_skipped_even_if_now_corrupt() {
    let dir = tempdir().unwrap();
    let name = origin_name(b"a", "png");
    let path = write(dir.path(), &format!("Images/{name}"), b"a");
    verifier(None).verify(dir.path()).unwrap();

    // Same size, different bytes, but no newer than the record: not re-read
    let record = canonical(&dir.path().join("Images")).join(RECORD);
    let record_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&record).unwrap());
    fs::write(&path, b"b").unwrap();
    filetime::set_file_mtime(
        &path,
        filetime::FileTime::from_unix_time(record_mtime.unix_seconds() - 60, 0),
    )
    .unwrap();

    let report = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.corrupted, 0);

    let full = verifier(None).with_full(true).verify(dir.path()).unwrap();
    assert_eq!(full.skipped, 0);
    assert_eq!(full.corrupted, 1);
    let set = VerifiedSet::load(&canonical(&dir.path().join("Images")), RECORD).unwrap();
    assert!(!set.contains(&name));
}

#[test]
fn test_file_modified_after_record_is_rechecked() {
    let dir = tempdir().unwrap();
    let name = origin_name(b"a", "png");
    let path = write(dir.path(), &format!("Images/{name}"), b"a");
    verifier(None).verify(dir.path()).unwrap();

    let record = canonical(&dir.path().join("Images")).join(RECORD);
    let record_mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&record).unwrap());
    fs::write(&path, b"b").unwrap();
    filetime::set_file_mtime(
        &path,
        filetime::FileTime::from_unix_time(record_mtime.unix_seconds() + 60, 0),
    )
    .unwrap();

    let report = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(report.skipped, 0);
    assert_eq!(report.corrupted, 1);
}

#[test]
fn test_raw_directories_are_never_verified() {
    let dir = tempdir().unwrap();
    let name = origin_name(b"expected", "png");
    write(dir.path(), &format!("Images Raw/{name}"), b"not what the name says");

    let report = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(report.checked, 0);
    assert_eq!(report.corrupted, 0);
    assert!(!dir.path().join("Images Raw").join(RECORD).exists());
}

#[test]
fn test_plain_files_are_untouched() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Images/photo.png", b"anything");

    let report = verifier(None).verify(dir.path()).unwrap();
    assert_eq!(report.checked, 0);
    assert_eq!(report.directories, 0);
}

#[test]
fn test_backup_inside_root_is_not_verified() {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("Corrupt/{}", origin_name(b"x", "png")), b"y");
    let backup = canonical(&dir.path().join("Corrupt"));

    let report = verifier(Some(backup)).verify(dir.path()).unwrap();
    assert_eq!(report.checked, 0);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_does_not_abort_verification() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = write(dir.path(), &format!("Images/{}", origin_name(b"l", "png")), b"l");
    write(dir.path(), &format!("Images/{}", origin_name(b"o", "png")), b"o");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let report = verifier(None).verify(dir.path()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.verified, 1);
}
