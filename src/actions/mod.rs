//! File actions module.
//!
//! This module provides the filesystem side effects of recovery and
//! quarantine:
//! - Copying a matched file to a recovery name
//! - Moving a corrupted file (and its derived artifacts) to a backup directory
//!
//! ```no_run
//! use modsum::actions::{copy_file, move_into};
//! use std::path::Path;
//!
//! copy_file(Path::new("Mods/Images/a.png"), Path::new("Recovered/a.png")).unwrap();
//! move_into(Path::new("Mods/Images/b.png"), Path::new("Backup")).unwrap();
//! ```

pub mod relocate;

pub use relocate::{copy_file, move_into, RelocateError, Relocated};
