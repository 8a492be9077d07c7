//! Content fingerprints and the two ways of obtaining one.
//!
//! # Overview
//!
//! A [`Fingerprint`] is a 160-bit SHA-1 digest, always rendered as 40
//! uppercase hex characters. Files are fingerprinted by one of two
//! strategies, picked from the filename alone:
//!
//! - **Origin-encoded**: the name contains the origin literal (for example
//!   `httpcloud3steamusercontent`) and its stem ends in 40 hex characters.
//!   The fingerprint is read straight from the name and no content is read.
//! - **Content**: anything else is hashed in full.
//!
//! # Example
//!
//! ```
//! use modsum::scanner::{OriginPattern, Strategy};
//!
//! let pattern = OriginPattern::new("httpcloud3steamusercontent");
//! let name = "httpcloud3steamusercontentcomugc1D6644503664E262C9C0B610A39C9AB2E98AC599C.png";
//! assert!(matches!(pattern.strategy(name), Strategy::OriginEncoded(_)));
//! assert!(matches!(pattern.strategy("photo.png"), Strategy::Content));
//! ```

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hasher::Hasher;
use super::HashError;

/// Number of hex characters in a canonical fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 40;

/// Raw digest length in bytes.
pub const FINGERPRINT_LEN: usize = 20;

/// A 160-bit content fingerprint.
///
/// Equality is byte equality, which makes hex comparison case-insensitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

/// Errors produced while parsing a fingerprint from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    /// The text does not have exactly 40 characters.
    #[error("expected {FINGERPRINT_HEX_LEN} hex characters, got {0}")]
    InvalidLength(usize),

    /// The text contains characters outside `[0-9a-fA-F]`.
    #[error("not a hex fingerprint: {0}")]
    InvalidHex(String),
}

impl Fingerprint {
    /// Wrap a raw digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Canonical uppercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Parse a 40-character hex string in either case.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] when the length is wrong or the text is
    /// not hexadecimal.
    pub fn parse_hex(text: &str) -> Result<Self, FingerprintError> {
        let chars = text.chars().count();
        if chars != FINGERPRINT_HEX_LEN {
            return Err(FingerprintError::InvalidLength(chars));
        }
        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|_| FingerprintError::InvalidHex(text.to_string()))?;
        Ok(Self(bytes))
    }

    /// Parse the final 40 characters of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::InvalidLength`] when `text` is shorter
    /// than 40 characters, or [`FingerprintError::InvalidHex`] when the tail
    /// is not hexadecimal.
    pub fn from_tail(text: &str) -> Result<Self, FingerprintError> {
        let tail = tail_chars(text, FINGERPRINT_HEX_LEN)
            .ok_or_else(|| FingerprintError::InvalidLength(text.chars().count()))?;
        Self::parse_hex(tail)
    }
}

/// The last `n` characters of `text`, or `None` if it is shorter.
pub(crate) fn tail_chars(text: &str, n: usize) -> Option<&str> {
    if n == 0 {
        return Some("");
    }
    let (start, _) = text.char_indices().rev().nth(n - 1)?;
    Some(&text[start..])
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// How a file's fingerprint is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The name embeds the fingerprint; trust it.
    OriginEncoded(Fingerprint),
    /// Hash the full content.
    Content,
}

/// Where an extracted fingerprint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintSource {
    /// Read from the filename.
    Name,
    /// Computed from the file bytes.
    Content,
}

/// Recognises origin-encoded filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPattern {
    literal: String,
}

impl OriginPattern {
    /// Create a pattern matching names that contain `literal`.
    #[must_use]
    pub fn new(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
        }
    }

    /// The origin literal.
    #[must_use]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Whether the filename carries the origin literal.
    #[must_use]
    pub fn matches(&self, filename: &str) -> bool {
        !self.literal.is_empty() && filename.contains(&self.literal)
    }

    /// The fingerprint embedded in an origin-encoded filename.
    ///
    /// Returns `None` when the name does not carry the origin literal or its
    /// stem does not end in 40 hex characters.
    #[must_use]
    pub fn embedded_fingerprint(&self, filename: &str) -> Option<Fingerprint> {
        if !self.matches(filename) {
            return None;
        }
        let stem = Path::new(filename).file_stem()?.to_str()?;
        Fingerprint::from_tail(stem).ok()
    }

    /// Pick the extraction strategy for a filename.
    #[must_use]
    pub fn strategy(&self, filename: &str) -> Strategy {
        match self.embedded_fingerprint(filename) {
            Some(fp) => Strategy::OriginEncoded(fp),
            None => Strategy::Content,
        }
    }
}

/// A fingerprint along with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted {
    pub fingerprint: Fingerprint,
    pub source: FingerprintSource,
}

/// Produces fingerprints for the build phase.
///
/// Origin-encoded names take the fast path and are never opened. This is
/// unsuitable for verification, which must always hash content.
#[derive(Debug, Clone)]
pub struct FingerprintExtractor {
    pattern: OriginPattern,
    hasher: Hasher,
}

impl FingerprintExtractor {
    #[must_use]
    pub fn new(pattern: OriginPattern, hasher: Hasher) -> Self {
        Self { pattern, hasher }
    }

    #[must_use]
    pub fn pattern(&self) -> &OriginPattern {
        &self.pattern
    }

    #[must_use]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Extract from a filename and a content reader.
    ///
    /// The reader is left untouched on the origin-encoded path.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the content path.
    pub fn extract<R: Read>(&self, filename: &str, reader: R) -> std::io::Result<Extracted> {
        match self.pattern.strategy(filename) {
            Strategy::OriginEncoded(fingerprint) => Ok(Extracted {
                fingerprint,
                source: FingerprintSource::Name,
            }),
            Strategy::Content => Ok(Extracted {
                fingerprint: self.hasher.hash_reader(reader)?,
                source: FingerprintSource::Content,
            }),
        }
    }

    /// Extract for a file on disk, opening it only when content is needed.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file has to be hashed and cannot be read.
    pub fn extract_file(&self, path: &Path) -> Result<Extracted, HashError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match self.pattern.strategy(&filename) {
            Strategy::OriginEncoded(fingerprint) => Ok(Extracted {
                fingerprint,
                source: FingerprintSource::Name,
            }),
            Strategy::Content => Ok(Extracted {
                fingerprint: self.hasher.hash_file(path)?,
                source: FingerprintSource::Content,
            }),
        }
    }
}
