//! Verify phase: detect corrupted origin-encoded files.
//!
//! - [`verifier`] hashes files and compares them with their names
//! - [`quarantine`] moves corrupt files and their derived artifacts aside

pub mod quarantine;
pub mod verifier;

pub use quarantine::{DerivedDir, Disposition, Quarantine, QuarantinedFile};
pub use verifier::{CorruptFile, CorruptionVerifier, VerifyError, VerifyReport};
