//! Moves consumed deliveries into the date-partitioned archive.
//!
//! The partition is the archive-time date (`<root>/<YYYYMMDD>/`), never a
//! date taken from the file name. Archiving is a move, so a second call for
//! the same source fails.

use crate::error::{IngestError, Result, ResultExt as _};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};

const PARTITION_FORMAT: &str = "%Y%m%d";

/// Archive `source` under today's partition of `root`.
///
/// # Errors
///
/// See [`archive_on`].
pub fn archive(source: &Path, root: &Path) -> Result<PathBuf> {
    archive_on(source, root, Local::now().date_naive())
}

/// Archive `source` (file or directory) under the `date` partition of `root`.
///
/// # Errors
///
/// Returns error if `source` no longer exists, the destination is already
/// taken, or the move fails.
pub fn archive_on(source: &Path, root: &Path, date: NaiveDate) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        IngestError::Other(format!("Cannot archive {}: no file name", source.display()))
    })?;

    if !source.exists() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} no longer exists", source.display()),
        )));
    }

    let partition = root.join(date.format(PARTITION_FORMAT).to_string());
    if !partition.is_dir() {
        std::fs::create_dir_all(&partition)
            .with_context(|| format!("Failed to create {}", partition.display()))?;
        tracing::info!("Created Archive Directory for {}", partition.display());
    }

    let destination = partition.join(file_name);
    if destination.exists() {
        return Err(IngestError::Other(format!(
            "Archive destination {} already exists",
            destination.display()
        )));
    }

    move_entry(source, &destination)?;
    tracing::info!(
        "Archived {} to {}",
        source.display(),
        destination.display()
    );
    Ok(destination)
}

/// Rename, falling back to copy + remove for files on another filesystem.
fn move_entry(source: &Path, destination: &Path) -> Result<()> {
    if let Err(e) = std::fs::rename(source, destination) {
        if source.is_dir() {
            return Err(IngestError::Other(format!(
                "Failed to move directory {}: {e}",
                source.display()
            )));
        }
        std::fs::copy(source, destination)
            .with_context(|| format!("Failed to move file (Rename error: {e})"))?;
        std::fs::remove_file(source)?;
    }
    Ok(())
}
