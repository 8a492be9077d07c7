//! Helpers shared by the integration tests.

use modsum::config::Config;
use modsum::scanner::{FingerprintExtractor, Fingerprint, Hasher, TreeScanner};
use std::fs;
use std::path::{Path, PathBuf};

pub const STEAM: &str = "httpcloud3steamusercontent";

pub fn sha1(content: &[u8]) -> Fingerprint {
    Hasher::new().hash_bytes(content)
}

/// An origin-encoded name whose embedded fingerprint is `sha1(content)`.
pub fn origin_name(content: &[u8], ext: &str) -> String {
    format!("{STEAM}comugc1{}.{ext}", sha1(content))
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

pub fn scanner(config: &Config, backup: Option<PathBuf>) -> TreeScanner {
    TreeScanner::new(
        config.walker_config(backup),
        FingerprintExtractor::new(config.origin(), Hasher::new()),
    )
    .with_io_threads(2)
}
