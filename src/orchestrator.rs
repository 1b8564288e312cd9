//! One ingestion run: check the directories, dispatch the requested
//! provider, then export the execution log.
//!
//! Only a missing download directory (or an archive directory that cannot be
//! created) ends the run early. Every other problem is logged and the run
//! continues to the log export.

use crate::config::Settings;
use crate::error::{IngestError, Result};
use crate::export::{ExportRecord, Exporter, export_log};
use crate::providers::{Provider, RunContext, VendorReport};
use crate::store::TableStore;
use std::path::PathBuf;

/// What a run did, in order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Provider whose path ran, if any.
    pub dispatched: Option<Provider>,
    /// Whether that path ran to the end.
    pub completed: bool,
    pub exports: Vec<ExportRecord>,
    pub archived: Vec<PathBuf>,
    /// Whether the execution log reached the store.
    pub log_exported: bool,
}

impl RunSummary {
    fn record(&mut self, report: VendorReport) {
        self.exports.extend(report.exports);
        self.archived.extend(report.archived);
    }

    pub fn failed_exports(&self) -> usize {
        self.exports.iter().filter(|e| !e.succeeded).count()
    }
}

/// Run the pipeline for `provider` against `store`.
///
/// # Errors
///
/// Returns [`IngestError::Config`] if the download directory does not exist
/// or the archive directory cannot be created. The log is not exported in
/// that case.
pub fn run(
    settings: &Settings,
    provider: Option<&str>,
    store: &dyn TableStore,
) -> Result<RunSummary> {
    tracing::info!("Executing provider ingestion");

    let exporter = Exporter::new(store);
    let mut summary = RunSummary::default();

    if let Some(name) = validate(settings, provider)? {
        dispatch(settings, name, &exporter, &mut summary);
    }

    summary.log_exported = export_log(&exporter, &settings.log.file);

    tracing::debug!(
        "Run finished: {} exports ({} failed), {} archived",
        summary.exports.len(),
        summary.failed_exports(),
        summary.archived.len()
    );
    Ok(summary)
}

/// Check the preconditions for dispatch.
///
/// `Ok(None)` means the run goes straight to the log export.
fn validate<'a>(settings: &Settings, provider: Option<&'a str>) -> Result<Option<&'a str>> {
    let download_dir = &settings.download_dir;
    if !download_dir.is_dir() {
        tracing::warn!("A valid path to a Download folder is required.");
        return Err(IngestError::Config(format!(
            "The folder does not exist at path: {}",
            download_dir.display()
        )));
    }

    if std::fs::read_dir(download_dir)?.next().is_none() {
        tracing::warn!("Download Directory is empty");
        return Ok(None);
    }

    if !settings.archive_dir.is_dir() {
        std::fs::create_dir_all(&settings.archive_dir).map_err(|e| {
            IngestError::Config(format!(
                "Archive directory {} cannot be created: {e}",
                settings.archive_dir.display()
            ))
        })?;
        tracing::info!(
            "Created Archive Directory at: {}",
            settings.archive_dir.display()
        );
    }

    let Some(name) = provider else {
        tracing::warn!("Please enter an input argument");
        return Ok(None);
    };

    if !settings.allows(name) {
        tracing::warn!("Please enter value of valid parser.");
        return Ok(None);
    }

    Ok(Some(name))
}

fn dispatch(settings: &Settings, name: &str, exporter: &Exporter<'_>, summary: &mut RunSummary) {
    tracing::info!("{name} parameter calling parser");

    // The allow-list admits substrings; the handler table does not.
    let Some(provider) = Provider::from_name(name) else {
        tracing::warn!("No ingestion path is registered for '{name}'");
        return;
    };

    let ctx = RunContext {
        download_dir: &settings.download_dir,
        archive_dir: &settings.archive_dir,
        exporter,
    };
    let mut report = VendorReport::default();
    let outcome = provider.run(&ctx, &mut report);

    summary.dispatched = Some(provider);
    summary.record(report);

    match outcome {
        Ok(()) => {
            summary.completed = true;
            tracing::info!("Executed {name} parser successfully");
        }
        Err(e @ IngestError::MissingArtifact(_)) => {
            tracing::error!("{e}");
            tracing::info!("{}", provider.missing_artifact_hint());
        }
        Err(e) => {
            tracing::error!("{name} ingestion aborted: {e}");
        }
    }
}
