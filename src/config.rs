//! Application configuration.
//!
//! Settings are layered, later sources winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, else `config.toml` in the platform config dir)
//! 3. Environment variables prefixed `MODSUM_` (nested keys split on `__`)
//! 4. CLI flags, applied by the caller
//!
//! ```toml
//! origin_pattern = "httpcloud3steamusercontent"
//! ignored_extensions = ["rawt", "rawm", "tmp"]
//! io_threads = 8
//!
//! [derived_dirs]
//! "Images Raw" = "rawt"
//! "Models Raw" = "rawm"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::{OriginPattern, WalkerConfig};
use crate::verify::DerivedDir;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "MODSUM_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Literal marking origin-encoded filenames.
    pub origin_pattern: String,

    /// Extensions never scanned or verified (no dot, any case).
    pub ignored_extensions: Vec<String>,

    /// File name of the fingerprint store inside the scan root.
    pub cache_file_name: String,

    /// File name of each directory's verification record.
    pub verified_file_name: String,

    /// Threads used for content hashing.
    pub io_threads: usize,

    /// Follow symbolic links during the walk.
    pub follow_symlinks: bool,

    /// Derived-artifact directory name to the extension of its files.
    /// These directories are never walked.
    pub derived_dirs: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin_pattern: "httpcloud3steamusercontent".to_string(),
            ignored_extensions: vec!["rawt".into(), "rawm".into(), "tmp".into()],
            cache_file_name: "sha1-cache.db".to_string(),
            verified_file_name: ".sha1-verified".to_string(),
            io_threads: 4,
            follow_symlinks: false,
            derived_dirs: BTreeMap::from([
                ("Images Raw".to_string(), "rawt".to_string()),
                ("Models Raw".to_string(), "rawm".to_string()),
            ]),
        }
    }
}

impl Config {
    /// Load the layered configuration, falling back to defaults on error.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        match Self::figment(path).extract() {
            Ok(config) => config,
            Err(e) => {
                if path.is_some() {
                    log::warn!("Ignoring unreadable config file: {}", e);
                } else {
                    log::debug!("Failed to load config, using defaults: {}", e);
                }
                Self::default()
            }
        }
    }

    /// The provider stack behind [`load`](Self::load).
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = path.map(Path::to_path_buf).or_else(Self::config_path) {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Default platform-specific config file location.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "modsum").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    #[must_use]
    pub fn origin(&self) -> OriginPattern {
        OriginPattern::new(self.origin_pattern.as_str())
    }

    /// Derived-artifact directories, in name order.
    #[must_use]
    pub fn derived(&self) -> Vec<DerivedDir> {
        self.derived_dirs
            .iter()
            .map(|(name, ext)| DerivedDir::new(name.as_str(), ext))
            .collect()
    }

    /// Walk settings shared by the build and verify phases.
    ///
    /// `excluded_path` is the backup directory, which is never scanned.
    #[must_use]
    pub fn walker_config(&self, excluded_path: Option<PathBuf>) -> WalkerConfig {
        WalkerConfig::default()
            .with_follow_symlinks(self.follow_symlinks)
            .with_excluded_dir_names(self.derived_dirs.keys().cloned())
            .with_excluded_path(excluded_path)
            .with_ignored_extensions(&self.ignored_extensions)
            .with_ignored_name_prefix(self.cache_file_name.as_str())
            .with_ignored_name_prefix(self.verified_file_name.as_str())
    }
}
