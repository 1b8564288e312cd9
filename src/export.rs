//! Publishes normalized datasets to the store.
//!
//! The exporter is a failure boundary: whatever goes wrong underneath is
//! logged and comes back as a failed [`ExportRecord`]. Nothing is retried.

use crate::error::IngestError;
use crate::reader::load_log_file;
use crate::store::{TableStore, WriteMode};
use polars::prelude::DataFrame;
use std::path::Path;

/// Table receiving the execution log at the end of every run.
pub const LOG_TABLE: &str = "ExecutionLogs";

/// Destination of one export. The write mode belongs to the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTarget {
    pub table: &'static str,
    pub mode: WriteMode,
}

impl ExportTarget {
    /// Target that must not exist yet.
    pub const fn create(table: &'static str) -> Self {
        Self {
            table,
            mode: WriteMode::CreateOrFail,
        }
    }

    /// Append-only target.
    pub const fn append(table: &'static str) -> Self {
        Self {
            table,
            mode: WriteMode::Append,
        }
    }
}

/// Result of one export, kept for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub table: &'static str,
    pub rows: usize,
    pub succeeded: bool,
}

pub struct Exporter<'a> {
    store: &'a dyn TableStore,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Write `df` to `target`. Returns whether the store accepted it.
    pub fn export(&self, df: &DataFrame, target: &ExportTarget) -> ExportRecord {
        let succeeded = match self.store.write_table(target.table, df, target.mode) {
            Ok(()) => {
                tracing::info!(
                    "Export data to {} table successfully ({} rows)",
                    target.table,
                    df.height()
                );
                true
            }
            Err(e) => {
                let e = IngestError::Export(format!("{}: {e}", target.table));
                tracing::error!("{e}");
                tracing::error!(
                    "An error occurred while connecting/pushing data to {} database (table {}, mode {})",
                    self.store.describe(),
                    target.table,
                    target.mode
                );
                false
            }
        };

        ExportRecord {
            table: target.table,
            rows: df.height(),
            succeeded,
        }
    }
}

/// Append the execution log to [`LOG_TABLE`] and delete the local file only
/// once the store has accepted it.
///
/// Returns whether the log reached the store.
pub fn export_log(exporter: &Exporter<'_>, log_file: &Path) -> bool {
    let df = match load_log_file(log_file) {
        Ok(df) => df,
        Err(e) => {
            tracing::error!("Failed to read execution log {}: {e}", log_file.display());
            return false;
        }
    };

    if !exporter.export(&df, &ExportTarget::append(LOG_TABLE)).succeeded {
        tracing::warn!("Execution log kept at {}", log_file.display());
        return false;
    }

    if let Err(e) = std::fs::remove_file(log_file) {
        tracing::warn!(
            "Execution log exported but {} could not be removed: {e}",
            log_file.display()
        );
    }
    tracing::info!("Logs exported successfully");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::store::MemoryStore;
    use polars::prelude::*;

    const LOG_LINES: &str = concat!(
        "\"2024-11-19 06:00:01\";\"INFO\";\"main.rs\";\"provider_ingest\";\"Executing\"\n",
        "\"2024-11-19 06:00:02\";\"WARN\";\"orchestrator.rs\";\"provider_ingest::orchestrator\";\"Download Directory is empty\"\n",
    );

    #[test]
    fn test_export_reports_store_outcome() -> Result<()> {
        let df = df!("a" => &["1", "2"])?;
        let target = ExportTarget::create("zEnrolmentData_Linux");

        let store = MemoryStore::new();
        let exporter = Exporter::new(&store);
        let first = exporter.export(&df, &target);
        assert!(first.succeeded);
        assert_eq!(first.rows, 2);

        // rerun against a populated table fails instead of appending
        let second = exporter.export(&df, &target);
        assert!(!second.succeeded);
        assert_eq!(store.table("zEnrolmentData_Linux").map(|t| t.height()), Some(2));
        Ok(())
    }

    #[test]
    fn test_log_file_deleted_after_successful_export() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log_file = dir.path().join("scriptExecution.logs");
        std::fs::write(&log_file, LOG_LINES)?;

        let store = MemoryStore::new();
        assert!(export_log(&Exporter::new(&store), &log_file));
        assert!(!log_file.exists());

        let logs = store.table(LOG_TABLE);
        assert_eq!(logs.as_ref().map(DataFrame::shape), Some((2, 5)));
        Ok(())
    }

    #[test]
    fn test_log_file_kept_when_store_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log_file = dir.path().join("scriptExecution.logs");
        std::fs::write(&log_file, LOG_LINES)?;

        let store = MemoryStore::failing();
        assert!(!export_log(&Exporter::new(&store), &log_file));
        assert!(log_file.exists());
        assert_eq!(std::fs::read_to_string(&log_file)?, LOG_LINES);
        Ok(())
    }

    #[test]
    fn test_log_export_appends_across_runs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log_file = dir.path().join("scriptExecution.logs");
        let store = MemoryStore::new();

        for _ in 0..2 {
            std::fs::write(&log_file, LOG_LINES)?;
            assert!(export_log(&Exporter::new(&store), &log_file));
        }

        assert_eq!(store.table(LOG_TABLE).map(|t| t.height()), Some(4));
        Ok(())
    }

    #[test]
    fn test_missing_log_file_is_reported_not_raised() {
        let store = MemoryStore::new();
        let missing = Path::new("/nonexistent/provider-ingest/scriptExecution.logs");
        assert!(!export_log(&Exporter::new(&store), missing));
        assert!(store.table_names().is_empty());
    }
}
