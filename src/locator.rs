//! Resolves a logical file name to the timestamp-suffixed delivery in a
//! directory.
//!
//! Providers deliver `membership-report.csv` as e.g.
//! `membership-report_20240101:120000.csv`. The matcher accepts
//! `<stem><anything>_<8 digits>:<6 digits><extension>`, anchored at the start
//! of the entry name only, and walks the directory listing in sorted order.
//! When several deliveries match, the lexicographically smallest name wins.

use crate::error::{IngestError, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Layout of the `_YYYYMMDD:HHMMSS` token.
const STAMP_FORMAT: &str = "%Y%m%d:%H%M%S";

/// A delivered file resolved from its logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Name the provider is known to deliver, e.g. `usage-report.csv`.
    pub logical_name: String,
    /// Full path of the matching directory entry.
    pub path: PathBuf,
    /// Delivery time encoded in the file name. `None` when the digits do not
    /// form a real date (the name still matches).
    pub stamp: Option<NaiveDateTime>,
}

impl SourceFile {
    /// File name of the resolved entry.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Found(SourceFile),
    NotFound,
}

impl Located {
    /// Turn a miss into [`IngestError::MissingArtifact`] naming `logical_name`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingArtifact`] for [`Located::NotFound`].
    pub fn require(self, logical_name: &str) -> Result<SourceFile> {
        match self {
            Self::Found(file) => Ok(file),
            Self::NotFound => Err(IngestError::MissingArtifact(logical_name.to_owned())),
        }
    }
}

/// Build the matcher for a logical name such as `usage-report.csv`.
///
/// # Errors
///
/// Returns error if the generated pattern fails to compile.
pub fn timestamp_pattern(logical_name: &str) -> Result<Regex> {
    let (stem, extension) = split_extension(logical_name);
    let pattern = format!(
        r"^{}.*_(\d{{8}}:\d{{6}}){}",
        regex::escape(stem),
        regex::escape(extension)
    );
    Regex::new(&pattern).map_err(|e| IngestError::Other(format!("Invalid file pattern: {e}")))
}

/// Find the delivery of `logical_name` in `directory`.
///
/// # Errors
///
/// Returns error if the directory cannot be listed. A missing file is not an
/// error here; it is reported as [`Located::NotFound`].
pub fn locate(directory: &Path, logical_name: &str) -> Result<Located> {
    let pattern = timestamp_pattern(logical_name)?;

    let mut names = std::fs::read_dir(directory)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();

    for name in names {
        if let Some(captures) = pattern.captures(&name) {
            let stamp = captures
                .get(1)
                .and_then(|m| NaiveDateTime::parse_from_str(m.as_str(), STAMP_FORMAT).ok());
            tracing::debug!("Resolved {logical_name} to {name}");
            return Ok(Located::Found(SourceFile {
                logical_name: logical_name.to_owned(),
                path: directory.join(&name),
                stamp,
            }));
        }
    }

    Ok(Located::NotFound)
}

/// Split `name.ext` into (`name`, `.ext`); the extension keeps its dot, and a
/// leading dot does not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
