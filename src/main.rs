//! # provider-ingest
//!
//! ```text
//! main()
//!   ├─> Parse CLI arguments and environment (clap)
//!   ├─> Build settings; blank log settings are logged and exit non-zero
//!   ├─> Install the execution log subscriber
//!   └─> Run the requested provider against PostgreSQL
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stderr)] // Configuration errors happen before logging exists

use anyhow::{Context as _, Result};
use clap::Parser as _;
use provider_ingest::cli::Cli;
use provider_ingest::config::Settings;
use provider_ingest::logging;
use provider_ingest::orchestrator::{self, RunSummary};
use provider_ingest::store::PgStore;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(summary) => {
            if !summary.log_exported {
                tracing::warn!("Execution log was not exported; it stays on disk");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let settings = Settings::from_cli(cli)
        .inspect_err(|e| {
            if !cli.log_file.as_os_str().is_empty()
                && let Err(log_err) = logging::record_startup_error(&cli.log_file, e)
            {
                eprintln!("Could not write to execution log: {log_err}");
            }
        })
        .context("Invalid configuration")?;
    logging::init(&settings.log).context("Failed to initialise logging")?;

    let store = PgStore::new(settings.store.clone())?;
    let summary = orchestrator::run(&settings, cli.provider.as_deref(), &store)
        .inspect_err(|e| tracing::error!("{e}"))?;
    Ok(summary)
}
