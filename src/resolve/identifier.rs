//! Desired identifiers read from a missing-file list.
//!
//! Each line is a URL-like string whose final 40 characters (after one
//! trailing `/` is dropped) are the wanted fingerprint:
//!
//! ```
//! use modsum::resolve::DesiredIdentifier;
//!
//! let id = DesiredIdentifier::parse(
//!     "http://cloud-3.steamusercontent.com/ugc/123/d6644503664e262c9c0b610a39c9ab2e98ac599c/",
//! )
//! .unwrap();
//! assert_eq!(id.fingerprint().to_hex(), "D6644503664E262C9C0B610A39C9AB2E98AC599C");
//! assert_eq!(
//!     id.normalized_name(),
//!     "httpcloud3steamusercontentcomugc123d6644503664e262c9c0b610a39c9ab2e98ac599c"
//! );
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scanner::{Fingerprint, FingerprintError, FINGERPRINT_HEX_LEN};

/// Characters dropped from an identifier to form its recovery file name.
pub const STRIPPED_CHARS: [char; 4] = ['.', '/', ':', '-'];

/// Errors produced while reading identifiers.
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// The line is empty once whitespace is trimmed.
    #[error("empty identifier")]
    Empty,

    /// Fewer than 40 characters remain after stripping.
    #[error("identifier too short ({len} chars, need {FINGERPRINT_HEX_LEN}): {line}")]
    TooShort { line: String, len: usize },

    /// The final 40 characters are not hexadecimal.
    #[error("identifier does not end in a hex fingerprint: {line}")]
    InvalidHex { line: String },

    /// The missing-file list could not be read.
    #[error("failed to read identifier list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One wanted file, identified by its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredIdentifier {
    raw: String,
    fingerprint: Fingerprint,
}

impl DesiredIdentifier {
    /// Parse one line of a missing-file list.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] for blank lines and for lines that do not
    /// end in a 40-character hex fingerprint.
    pub fn parse(line: &str) -> Result<Self, IdentifierError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        let raw = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let fingerprint = Fingerprint::from_tail(raw).map_err(|e| match e {
            FingerprintError::InvalidLength(len) => IdentifierError::TooShort {
                line: raw.to_string(),
                len,
            },
            FingerprintError::InvalidHex(_) => IdentifierError::InvalidHex {
                line: raw.to_string(),
            },
        })?;

        Ok(Self {
            raw: raw.to_string(),
            fingerprint,
        })
    }

    /// The identifier with surrounding whitespace and one trailing `/` removed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The identifier with [`STRIPPED_CHARS`] removed.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.raw.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect()
    }

    /// Recovery file name for a match found at `matched`.
    ///
    /// The extension comes from the matched file, never from the identifier.
    #[must_use]
    pub fn recovery_file_name(&self, matched: &Path) -> String {
        let mut name = self.normalized_name();
        if let Some(ext) = matched.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        name
    }
}

/// Read every line of a missing-file list.
///
/// Lines are returned as-is; parse them with [`DesiredIdentifier::parse`].
///
/// # Errors
///
/// Returns [`IdentifierError::Read`] if the file cannot be read.
pub fn read_identifiers(path: &Path) -> Result<Vec<String>, IdentifierError> {
    let text = fs::read_to_string(path).map_err(|source| IdentifierError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text.lines().map(str::to_string).collect())
}
