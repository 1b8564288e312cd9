//! Execution log for an ingestion run.
//!
//! Every event is written twice: a compact line on stdout for whoever runs the
//! job by hand, and a record in the configured log file. The file records are
//! `;`-separated quoted fields, one per line:
//!
//! ```text
//! "2024-11-19 06:00:01";"INFO";"orchestrator.rs";"provider_ingest::orchestrator";"Executing provider ingestion"
//! ```
//!
//! The five fields line up with the `ExecutionLogs` table columns
//! (`logDateTime`, `severity`, `source`, `function`, `description`), which is
//! how the trailing log export reads the file back.
//!
//! ## Usage
//!
//! ```no_run
//! use provider_ingest::config::LogSettings;
//! use provider_ingest::logging;
//! use tracing::level_filters::LevelFilter;
//!
//! let settings = LogSettings {
//!     file: "/var/log/provider-ingest.logs".into(),
//!     level: LevelFilter::INFO,
//! };
//! logging::init(&settings)?;
//! tracing::info!("Executing provider ingestion");
//! # Ok::<(), provider_ingest::error::IngestError>(())
//! ```

use crate::config::LogSettings;
use crate::error::{IngestError, Result};
use std::fmt;
use std::path::Path;
use tracing::{Event, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Timestamp layout of the first log field.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats events as `;`-separated execution-log records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionLogFormat;

impl<S, N> FormatEvent<S, N> for ExecutionLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut description = String::new();
        ctx.format_fields(Writer::new(&mut description), event)?;

        let source = meta
            .file()
            .and_then(|f| Path::new(f).file_name())
            .and_then(|f| f.to_str())
            .unwrap_or("unknown");
        let function = meta.module_path().unwrap_or_else(|| meta.target());
        let timestamp = chrono::Local::now().format(LOG_TIME_FORMAT).to_string();

        writeln!(
            writer,
            "{};{};{};{};{}",
            quote(&timestamp),
            quote(&meta.level().to_string()),
            quote(source),
            quote(function),
            quote(&description)
        )
    }
}

/// Wrap a field in double quotes, doubling any embedded quote.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Layer writing execution-log records to exactly `path`.
fn execution_log_layer<S>(
    path: &Path,
) -> Result<tracing_subscriber::fmt::Layer<S, DefaultFields, ExecutionLogFormat, RollingFileAppender>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file_name = path.file_name().ok_or_else(|| {
        IngestError::Config(format!("Log file path has no file name: {}", path.display()))
    })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|e| {
            IngestError::Config(format!("Failed to open log file {}: {e}", path.display()))
        })?;

    Ok(tracing_subscriber::fmt::layer()
        .event_format(ExecutionLogFormat)
        .with_ansi(false)
        .with_writer(appender))
}

/// Initializes the global subscriber: stdout plus the execution log file.
///
/// `RUST_LOG` may refine the configured level; driver chatter from `sqlx` is
/// capped at `warn` so query text never lands in the execution log.
///
/// # Errors
///
/// Returns error if the log file cannot be opened or a subscriber is already
/// installed.
pub fn init(settings: &LogSettings) -> Result<()> {
    let file_layer = execution_log_layer(&settings.file)?;

    let sqlx_cap = "sqlx=warn"
        .parse()
        .map_err(|e| IngestError::Config(format!("Invalid log directive: {e}")))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(settings.level.into())
        .from_env_lossy()
        .add_directive(sqlx_cap);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| IngestError::Config(format!("Failed to initialise logging: {e}")))?;

    tracing::debug!("Logging initialised, log file: {}", settings.file.display());

    Ok(())
}

/// Write `err` to the execution log at `path` without installing a global
/// subscriber. Used when settings fail to build, so the failure still reaches
/// the log a later run exports.
///
/// # Errors
///
/// Returns error if the log file cannot be opened.
pub fn record_startup_error(path: &Path, err: &IngestError) -> Result<()> {
    let subscriber = tracing_subscriber::registry().with(execution_log_layer(path)?);
    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!("{err}");
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_doubles_embedded_quotes() {
        assert_eq!(quote(r#"say "hi""#), r#""say ""hi""""#);
        assert_eq!(quote(""), r#""""#);
    }

    #[test]
    fn test_records_have_five_quoted_fields() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scriptExecution.logs");

        let subscriber = tracing_subscriber::registry().with(execution_log_layer(&path)?);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("Download Directory is \"empty\"");
        });

        let content = std::fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or_default();
        assert!(
            line.ends_with(
                r#";"WARN";"logging.rs";"provider_ingest::logging::tests";"Download Directory is ""empty""""#
            ),
            "unexpected record: {line}"
        );
        let timestamp = line.split(';').next().unwrap_or_default().trim_matches('"');
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, LOG_TIME_FORMAT).is_ok());
        Ok(())
    }

    #[test]
    fn test_startup_error_lands_in_execution_log() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scriptExecution.logs");
        let err = IngestError::Config("The LOGLEVEL variable is blank".to_owned());

        record_startup_error(&path, &err)?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains(r#";"WARN";"#));
        assert!(content.contains("The LOGLEVEL variable is blank"));
        Ok(())
    }
}
