//! Resolve phase: recover missing files by fingerprint.

pub mod identifier;
pub mod resolver;

pub use identifier::{read_identifiers, DesiredIdentifier, IdentifierError, STRIPPED_CHARS};
pub use resolver::{MissingResolver, ResolveReport, ResolvedMatch};
