//! Per-provider ingestion paths.
//!
//! Every provider is one variant of [`Provider`] with one handler. Handlers
//! locate their deliveries, export the normalized datasets and archive what
//! they consumed. A missing delivery aborts only that provider's path.

pub mod cisco;
pub mod coursera;
pub mod linux;
pub mod simplilearn;

use crate::archive;
use crate::error::Result;
use crate::export::{ExportRecord, ExportTarget, Exporter};
use crate::locator::{self, SourceFile};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

type Handler = fn(&RunContext<'_>, &mut VendorReport) -> Result<()>;

/// Supported learning providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Coursera,
    Linux,
    SimpliLearn,
    Cisco,
}

/// Name → provider lookup used for dispatch. Adding a provider means adding
/// a variant and a row here.
const PROVIDERS: [(&str, Provider); 4] = [
    ("Coursera", Provider::Coursera),
    ("Linux", Provider::Linux),
    ("SimpliLearn", Provider::SimpliLearn),
    ("Cisco", Provider::Cisco),
];

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coursera => "Coursera",
            Self::Linux => "Linux",
            Self::SimpliLearn => "SimpliLearn",
            Self::Cisco => "Cisco",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        PROVIDERS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, provider)| *provider)
    }

    fn handler(self) -> Handler {
        match self {
            Self::Coursera => coursera::ingest,
            Self::Linux => linux::ingest,
            Self::SimpliLearn => simplilearn::ingest,
            Self::Cisco => cisco::ingest,
        }
    }

    /// Remediation logged when a delivery is missing.
    pub fn missing_artifact_hint(&self) -> &'static str {
        match self {
            Self::Coursera => "Please ensure all Coursera files are in the Downloads directory",
            Self::Linux => {
                "Please ensure the eLearning Client Usage file is in the Downloads directory"
            }
            Self::SimpliLearn => "Please ensure the SimpliLearn file is in the Downloads directory",
            Self::Cisco => "Please ensure the Cisco Data folder is in the Downloads directory",
        }
    }

    /// Run this provider's path, recording exports and archives in `report`
    /// as they happen so a failure part-way keeps what was already done.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the path.
    pub fn run(self, ctx: &RunContext<'_>, report: &mut VendorReport) -> Result<()> {
        (self.handler())(ctx, report)
    }
}

/// What a provider handler works with.
pub struct RunContext<'a> {
    pub download_dir: &'a Path,
    pub archive_dir: &'a Path,
    pub exporter: &'a Exporter<'a>,
}

impl RunContext<'_> {
    /// Resolve a timestamped delivery in the download directory.
    fn locate(&self, logical_name: &str) -> Result<SourceFile> {
        locator::locate(self.download_dir, logical_name)?.require(logical_name)
    }

    fn export(&self, df: &DataFrame, target: ExportTarget, report: &mut VendorReport) {
        report.exports.push(self.exporter.export(df, &target));
    }

    fn archive(&self, path: &Path, report: &mut VendorReport) -> Result<()> {
        report.archived.push(archive::archive(path, self.archive_dir)?);
        Ok(())
    }
}

/// Outcome of one provider path.
#[derive(Debug, Clone, Default)]
pub struct VendorReport {
    pub exports: Vec<ExportRecord>,
    pub archived: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        for (name, provider) in PROVIDERS {
            assert_eq!(Provider::from_name(name), Some(provider));
            assert_eq!(provider.as_str(), name);
        }
        assert_eq!(Provider::from_name("Cis"), None);
        assert_eq!(Provider::from_name("coursera"), None);
        assert_eq!(Provider::from_name(""), None);
    }
}
