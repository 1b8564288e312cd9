//! Error taxonomy for the ingestion run.
//!
//! Only [`IngestError::Config`] is allowed to end the process. Everything else
//! is caught at the narrowest boundary that can still make progress:
//!
//! - [`IngestError::MissingArtifact`] aborts the current provider path only.
//! - [`IngestError::StructuralMismatch`] skips a single Cisco course file.
//! - [`IngestError::Export`] is reported by the exporter as a failed write.
//!
//! ```
//! use provider_ingest::error::IngestError;
//!
//! fn is_fatal(err: &IngestError) -> bool {
//!     matches!(err, IngestError::Config(_))
//! }
//!
//! assert!(is_fatal(&IngestError::Config("LOGFILE is blank".to_owned())));
//! assert!(!is_fatal(&IngestError::MissingArtifact("usage-report.csv".to_owned())));
//! ```

use std::fmt;

/// Main error type for ingestion operations.
#[derive(Debug)]
pub enum IngestError {
    /// A required setting is blank, unset or unusable.
    Config(String),

    /// An expected file or folder is absent from the download directory.
    MissingArtifact(String),

    /// A dataset does not have the shape its fixed schema requires.
    StructuralMismatch(String),

    /// The store rejected a write or could not be reached.
    Export(String),

    /// I/O errors (listing, moving, reading files)
    Io(std::io::Error),

    /// Dataframe errors raised by polars
    DataProcessing(String),

    /// Errors raised by the database driver
    Database(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::MissingArtifact(name) => {
                write!(f, "The file does not exist in download directory: {name}")
            }
            Self::StructuralMismatch(msg) => write!(f, "Structural mismatch: {msg}"),
            Self::Export(msg) => write!(f, "Export error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Database(msg) => write!(f, "Database error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<polars::error::PolarsError> for IngestError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<calamine::Error> for IngestError {
    fn from(err: calamine::Error) -> Self {
        Self::DataProcessing(format!("spreadsheet: {err}"))
    }
}

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<IngestError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: IngestError = e.into();
            IngestError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: IngestError = e.into();
            IngestError::Other(format!("{}: {}", f(), err))
        })
    }
}
