//! Loads delivered files into dataframes.
//!
//! Every cell is read as text. Provider exports mix dates, percentages and
//! free text in the same columns, and the staging tables keep them verbatim;
//! typing happens downstream of the store.
//!
//! Empty cells and the usual placeholder tokens (`N/A`, `NULL`, `NaN`, ...)
//! become nulls in both CSV and workbook input. Workbook dates are written as
//! `YYYY-MM-DD HH:MM:SS`.

use crate::error::{IngestError, Result, ResultExt as _};
use calamine::{Data, Reader as _, open_workbook_auto};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Cell values that mean "no value" in provider exports.
pub const MISSING_TOKENS: [&str; 18] = [
    "-1.#IND", "1.#QNAN", "1.#IND", "-1.#QNAN", "#N/A N/A", "#N/A", "N/A", "n/a", "NA", "<NA>",
    "#NA", "NULL", "null", "NaN", "-NaN", "nan", "-nan", "None",
];

/// Text layout of workbook date cells.
pub const CELL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names of the execution log, in record order.
pub const LOG_COLUMNS: [&str; 5] = ["logDateTime", "severity", "source", "function", "description"];

/// Load a CSV or spreadsheet file, dispatching on its extension.
///
/// # Errors
///
/// Returns error for unsupported extensions or unreadable files.
pub fn load_df(path: &Path) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path),
        _ => Err(IngestError::DataProcessing(format!(
            "Unsupported file extension: {ext}"
        ))),
    }
}

/// Read a CSV file with a header row. Empty fields and [`MISSING_TOKENS`]
/// become nulls.
///
/// # Errors
///
/// Returns error if the file cannot be opened or parsed.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| options.with_null_values(Some(missing_values())))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to read CSV {}", path.display()))
}

/// Read the first worksheet of a workbook; its first row is the header.
///
/// # Errors
///
/// Returns error if the workbook cannot be opened or has no worksheet.
pub fn load_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        IngestError::StructuralMismatch(format!("{} has no worksheets", path.display()))
    })??;

    let mut rows = range.rows();
    let header = rows
        .next()
        .map(|row| row.iter().map(header_text).collect::<Vec<_>>())
        .unwrap_or_default();
    let names = normalise_headers(header);

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (idx, column) in values.iter_mut().enumerate() {
            column.push(row.get(idx).and_then(cell_text));
        }
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, cells)| Column::new(name.into(), cells))
        .collect::<Vec<_>>();

    tracing::debug!(
        "Read {} columns from worksheet 0 of {}",
        columns.len(),
        path.display()
    );

    Ok(DataFrame::new(columns)?)
}

/// Read the `;`-separated execution log back into a dataframe with
/// [`LOG_COLUMNS`] as its header.
///
/// # Errors
///
/// Returns [`IngestError::StructuralMismatch`] if records do not have exactly
/// five fields, or an I/O error if the file is missing.
pub fn load_log_file(path: &Path) -> Result<DataFrame> {
    if std::fs::metadata(path)?.len() == 0 {
        return Ok(empty_text_frame(&LOG_COLUMNS)?);
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|options| options.with_separator(b';'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to read log file {}", path.display()))?;

    if df.width() != LOG_COLUMNS.len() {
        return Err(IngestError::StructuralMismatch(format!(
            "log file {} has {} fields per record, expected {}",
            path.display(),
            df.width(),
            LOG_COLUMNS.len()
        )));
    }
    df.set_column_names(LOG_COLUMNS)?;
    Ok(df)
}

/// Zero-row frame with text columns named `names`.
///
/// # Errors
///
/// Returns error if `names` contains duplicates.
pub fn empty_text_frame(names: &[&str]) -> PolarsResult<DataFrame> {
    DataFrame::new(
        names
            .iter()
            .map(|name| Column::new_empty((*name).into(), &DataType::String))
            .collect(),
    )
}

fn missing_values() -> NullValues {
    NullValues::AllColumns(MISSING_TOKENS.iter().map(|t| (*t).into()).collect())
}

/// Header cells keep placeholder-looking names verbatim.
fn header_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.clone()),
        other => cell_text(other),
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if MISSING_TOKENS.contains(&s.as_str()) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::DateTime(dt) if dt.is_datetime() => dt
            .as_datetime()
            .map(|d| d.format(CELL_DATETIME_FORMAT).to_string()),
        Data::DateTime(dt) => dt.as_duration().map(|d| {
            let secs = d.num_seconds();
            format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
        }),
        other => Some(other.to_string()),
    }
}

/// Blank headers become `Unnamed: <index>` and repeats get a `.<n>` suffix, so
/// every column has a unique name.
fn normalise_headers(header: Vec<Option<String>>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = match name {
                Some(n) if !n.trim().is_empty() => n,
                _ => format!("Unnamed: {idx}"),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_reads_text_and_nulls() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report_20240101:120000.csv");
        std::fs::write(&path, "id,score,name\n1,9.5,Ann\n2,,Bob\n")?;

        let df = load_df(&path)?;
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("id")?.dtype(), &DataType::String);
        assert_eq!(df.column("score")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_csv_placeholder_tokens_are_null() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("activity.csv");
        std::fs::write(
            &path,
            "Class 1,NA,Score\nN/A,x,NULL\nIntro,y,nan\n#N/A,z,Not applicable\n",
        )?;

        let df = load_csv(&path)?;
        assert_eq!(df.column("Class 1")?.null_count(), 2);
        assert_eq!(df.column("Score")?.null_count(), 2);
        // header names are never treated as placeholders
        assert_eq!(df.column("NA")?.null_count(), 0);
        Ok(())
    }

    fn write_typed_workbook(path: &Path) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        for (col, name) in ["Email", "Logins", "Hours", "Last Login", "Notes"].iter().enumerate() {
            sheet.write_string(0, u16::try_from(col).unwrap_or_default(), *name)?;
        }
        sheet.write_string(1, 0, "ann@x.org")?;
        sheet.write_number(1, 1, 12)?;
        sheet.write_number(1, 2, 3.5)?;
        sheet.write_datetime_with_format(1, 3, &ExcelDateTime::from_ymd(2024, 1, 1)?, &date_format)?;
        sheet.write_string(1, 4, "N/A")?;
        sheet.write_string(2, 0, "bob@x.org")?;
        sheet.write_string(2, 4, "second login pending")?;

        workbook.save(path)?;
        Ok(())
    }

    #[test]
    fn test_workbook_cells_read_as_text() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("eLearning Client Usage_20240101:120000.xlsx");
        write_typed_workbook(&path).map_err(|e| IngestError::Other(e.to_string()))?;

        let df = load_df(&path)?;
        assert_eq!(df.shape(), (2, 5));

        let cells = |name: &str| -> Result<Vec<Option<String>>> {
            Ok(df
                .column(name)?
                .str()?
                .into_iter()
                .map(|v| v.map(ToOwned::to_owned))
                .collect())
        };
        assert_eq!(cells("Email")?, vec![Some("ann@x.org".to_owned()), Some("bob@x.org".to_owned())]);
        assert_eq!(cells("Logins")?, vec![Some("12".to_owned()), None]);
        assert_eq!(cells("Hours")?, vec![Some("3.5".to_owned()), None]);
        assert_eq!(
            cells("Last Login")?,
            vec![Some("2024-01-01 00:00:00".to_owned()), None]
        );
        assert_eq!(
            cells("Notes")?,
            vec![None, Some("second login pending".to_owned())]
        );
        Ok(())
    }

    #[test]
    fn test_unsupported_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello")?;

        assert!(matches!(load_df(&path), Err(IngestError::DataProcessing(_))));
        Ok(())
    }

    #[test]
    fn test_log_file_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scriptExecution.logs");
        std::fs::write(
            &path,
            concat!(
                "\"2024-11-19 06:00:01\";\"INFO\";\"main.rs\";\"provider_ingest\";\"Executing\"\n",
                "\"2024-11-19 06:00:02\";\"WARN\";\"orchestrator.rs\";\"provider_ingest::orchestrator\";\"Said \"\"no\"\"; twice\"\n",
            ),
        )?;

        let df = load_log_file(&path)?;
        assert_eq!(df.shape(), (2, 5));
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, LOG_COLUMNS);
        let description = df.column("description")?.str()?.get(1).map(ToOwned::to_owned);
        assert_eq!(description.as_deref(), Some("Said \"no\"; twice"));
        Ok(())
    }

    #[test]
    fn test_empty_log_file_gives_empty_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scriptExecution.logs");
        std::fs::write(&path, "")?;

        let df = load_log_file(&path)?;
        assert_eq!(df.shape(), (0, 5));
        Ok(())
    }

    #[test]
    fn test_normalise_headers() {
        let header = vec![
            Some("Email".to_owned()),
            None,
            Some("Email".to_owned()),
            Some(" ".to_owned()),
            Some("Email".to_owned()),
        ];
        assert_eq!(
            normalise_headers(header),
            vec!["Email", "Unnamed: 1", "Email.1", "Unnamed: 3", "Email.2"]
        );
    }
}
