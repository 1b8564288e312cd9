//! Relational store behind the exporter.
//!
//! [`TableStore`] is the seam: the pipeline only ever asks a store to write a
//! whole dataframe to a named table under a [`WriteMode`]. [`PgStore`] is the
//! production PostgreSQL implementation; [`MemoryStore`] keeps tables in
//! process with the same write-mode rules.

use crate::config::StoreSettings;
use crate::error::{IngestError, Result, ResultExt as _};
use polars::prelude::*;
use sqlx::postgres::PgConnection;
use sqlx::Connection as _;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

/// Rows serialised per `COPY` chunk.
const COPY_CHUNK_ROWS: usize = 10_000;

/// How a write treats a table that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the table; fail if it already exists.
    CreateOrFail,
    /// Create the table if absent, then append rows.
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateOrFail => write!(f, "fail"),
            Self::Append => write!(f, "append"),
        }
    }
}

pub trait TableStore {
    /// Write every row of `df` to `table`.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable, the table exists under
    /// [`WriteMode::CreateOrFail`], or the rows are rejected.
    fn write_table(&self, table: &str, df: &DataFrame, mode: WriteMode) -> Result<()>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

/// PostgreSQL store. Each write opens and closes its own connection.
pub struct PgStore {
    settings: StoreSettings,
    runtime: tokio::runtime::Runtime,
}

impl PgStore {
    /// # Errors
    ///
    /// Returns error if the driver runtime cannot be started.
    pub fn new(settings: StoreSettings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start database runtime")?;
        Ok(Self { settings, runtime })
    }

    async fn push_dataframe(&self, table: &str, df: &DataFrame, mode: WriteMode) -> Result<()> {
        let options = self.settings.connect_options()?;
        let mut conn = PgConnection::connect_with(&options)
            .await
            .with_context(|| format!("Failed to connect to {}", self.settings.describe()))?;

        let identifier = quote_identifier(table);
        let create_table_query = create_table_sql(&identifier, df, mode);

        sqlx::query(&create_table_query)
            .execute(&mut conn)
            .await
            .with_context(|| format!("Failed to create table {identifier}"))?;

        let height = df.height();
        if height > 0 && df.width() > 0 {
            let mut writer = conn
                .copy_in_raw(&format!(
                    "COPY {identifier} FROM STDIN WITH (FORMAT csv, NULL '')"
                ))
                .await
                .context("Failed to initiate COPY command")?;

            for offset in (0..height).step_by(COPY_CHUNK_ROWS) {
                let len = COPY_CHUNK_ROWS.min(height - offset);
                let mut chunk = df.slice(i64::try_from(offset).unwrap_or(i64::MAX), len);

                let mut buf = Vec::new();
                CsvWriter::new(&mut buf)
                    .include_header(false)
                    .with_separator(b',')
                    .with_null_value(String::new())
                    .finish(&mut chunk)
                    .context("Failed to serialize dataframe chunk to CSV")?;

                writer
                    .send(buf)
                    .await
                    .context("Failed to send data chunk via COPY")?;
            }

            let rows = writer
                .finish()
                .await
                .context("Failed to finish COPY command")?;
            tracing::debug!("Copied {rows} rows into {identifier}");
        }

        conn.close().await?;
        Ok(())
    }
}

impl TableStore for PgStore {
    fn write_table(&self, table: &str, df: &DataFrame, mode: WriteMode) -> Result<()> {
        self.runtime.block_on(self.push_dataframe(table, df, mode))
    }

    fn describe(&self) -> String {
        self.settings.describe()
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement for `df`, typed from its polars schema.
fn create_table_sql(identifier: &str, df: &DataFrame, mode: WriteMode) -> String {
    let column_definitions = df
        .schema()
        .iter()
        .map(|(name, dtype)| format!("{} {}", quote_identifier(name), sql_type(dtype)))
        .collect::<Vec<_>>()
        .join(", ");

    match mode {
        WriteMode::CreateOrFail => format!("CREATE TABLE {identifier} ({column_definitions})"),
        WriteMode::Append => {
            format!("CREATE TABLE IF NOT EXISTS {identifier} ({column_definitions})")
        }
    }
}

fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "BIGINT",
        DataType::Float32 | DataType::Float64 => "DOUBLE PRECISION",
        DataType::Boolean => "BOOLEAN",
        DataType::Date => "DATE",
        DataType::Datetime(_, _) => "TIMESTAMPTZ",
        _ => "TEXT",
    }
}

/// In-process store with the same write-mode rules as the database.
///
/// `failing()` builds a store that rejects every write, standing in for an
/// unreachable server.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<BTreeMap<String, DataFrame>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Copy of a stored table.
    pub fn table(&self, name: &str) -> Option<DataFrame> {
        self.tables.borrow().get(name).cloned()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.borrow().keys().cloned().collect()
    }
}

impl TableStore for MemoryStore {
    fn write_table(&self, table: &str, df: &DataFrame, mode: WriteMode) -> Result<()> {
        if self.fail_writes {
            return Err(IngestError::Database(format!(
                "connection refused while writing {table}"
            )));
        }

        let mut tables = self.tables.borrow_mut();
        if let Some(existing) = tables.get_mut(table) {
            return match mode {
                WriteMode::CreateOrFail => Err(IngestError::Database(format!(
                    "Table '{table}' already exists."
                ))),
                WriteMode::Append => {
                    existing.vstack_mut(df)?;
                    Ok(())
                }
            };
        }

        tables.insert(table.to_owned(), df.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql_by_mode() -> Result<()> {
        let df = df!("Learner Email" => &["a@x.org"], "Score" => &[3_i64])?;

        assert_eq!(
            create_table_sql("\"zClassData\"", &df, WriteMode::CreateOrFail),
            "CREATE TABLE \"zClassData\" (\"Learner Email\" TEXT, \"Score\" BIGINT)"
        );
        assert!(
            create_table_sql("\"ExecutionLogs\"", &df, WriteMode::Append)
                .starts_with("CREATE TABLE IF NOT EXISTS \"ExecutionLogs\" (")
        );
        Ok(())
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_memory_store_write_modes() -> Result<()> {
        let store = MemoryStore::new();
        let df = df!("a" => &["1", "2"])?;

        store.write_table("t", &df, WriteMode::CreateOrFail)?;
        assert!(store.write_table("t", &df, WriteMode::CreateOrFail).is_err());

        store.write_table("t", &df, WriteMode::Append)?;
        store.write_table("logs", &df, WriteMode::Append)?;

        assert_eq!(store.table("t").map(|t| t.height()), Some(4));
        assert_eq!(store.table_names(), vec!["logs".to_owned(), "t".to_owned()]);
        Ok(())
    }

    #[test]
    fn test_failing_store_rejects_writes() -> Result<()> {
        let store = MemoryStore::failing();
        let df = df!("a" => &["1"])?;

        assert!(store.write_table("t", &df, WriteMode::Append).is_err());
        assert!(store.table("t").is_none());
        Ok(())
    }
}
