//! Ctrl+C handling.
//!
//! A single [`ShutdownHandler`] wraps the `AtomicBool` that the walker,
//! indexer and verifier poll between files. Interrupting a build still
//! flushes what was scanned, so a later run picks up where this one stopped.
//!
//! ```rust,no_run
//! use modsum::signal::install_handler;
//!
//! let handler = install_handler();
//! let flag = handler.get_flag();
//! // hand `flag` to TreeScanner / CorruptionVerifier
//! # let _ = flag;
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// A clone of the flag for worker code.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    fn reset_and_clone(&self) -> Self {
        self.reset();
        self.clone()
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// The hook is registered once per process. Later calls reset and return the
/// same handler, so repeated `run_app` calls (as in tests) all work. If the
/// hook cannot be registered the returned handler is still usable for manual
/// shutdown requests.
pub fn install_handler() -> ShutdownHandler {
    GLOBAL_HANDLER
        .get_or_init(|| {
            let handler = ShutdownHandler::new();
            let flag = handler.get_flag();
            let installed = ctrlc::set_handler(move || {
                flag.store(true, Ordering::SeqCst);
                let mut stderr = std::io::stderr();
                let _ = writeln!(stderr, "\nInterrupted. Saving progress...");
                let _ = stderr.flush();
                log::info!("Shutdown signal received");
            });
            if let Err(e) = installed {
                log::debug!("Ctrl+C handler not installed: {}", e);
            }
            handler
        })
        .reset_and_clone()
}
