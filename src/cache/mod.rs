//! Persistent state for modsum.
//!
//! # Architecture
//!
//! * [`database`]: the SQLite-backed [`FingerprintStore`], one per scanned root.
//! * [`entry`]: the rows it holds ([`CacheEntry`] per fingerprint, [`ScanRecord`] per location).
//! * [`verified`]: the per-directory [`VerifiedSet`] used by verification.
//!
//! # Staleness
//!
//! A scanned location is skipped on the next build while its size and
//! modification time are unchanged. Entries for files that have since been
//! deleted are kept; they only surface as a failed copy when resolved.

pub mod database;
pub mod entry;
pub mod verified;

pub use database::{FingerprintStore, FlushStats, StoreError, StoreResult};
pub use entry::{CacheEntry, ScanRecord};
pub use verified::VerifiedSet;
