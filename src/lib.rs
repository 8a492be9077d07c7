//! modsum - integrity checking and recovery for content-addressed mod caches.
//!
//! Files in a cache such as Tabletop Simulator's `Mods` tree are named after
//! the URL they were downloaded from, and that name ends in the SHA-1 of the
//! content. modsum uses this to:
//!
//! - detect corrupted files by re-hashing them and comparing with the name
//!   ([`verify`])
//! - recover files that are missing under their expected name by finding any
//!   file in the tree with the wanted fingerprint ([`scanner`], [`cache`],
//!   [`resolve`])

pub mod actions;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod resolve;
pub mod scanner;
pub mod signal;
pub mod verify;

use anyhow::{Context as _, Result};

use crate::app::Context;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::ExitCode;

/// Run one CLI invocation and return the exit code for its outcome.
///
/// # Errors
///
/// Returns an error for fatal conditions: invalid paths, an unreadable or
/// unwritable store, or a failure to write the report.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref());
    log::debug!("Configuration: {:?}", config);
    let handler = signal::install_handler();
    let ctx = Context::new(config, handler.get_flag(), cli.quiet);

    let (report, format) = match &cli.command {
        Commands::Index(args) => (app::index(&ctx, args)?, args.run.output),
        Commands::FindMissing(args) => (app::find_missing(&ctx, args)?, args.run.output),
        Commands::Verify(args) => (app::verify(&ctx, args)?, args.run.output),
    };

    let mut stdout = std::io::stdout().lock();
    report
        .write_to(&mut stdout, format)
        .context("failed to write report")?;
    Ok(report.exit_code())
}
