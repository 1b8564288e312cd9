//! Cisco Networking Academy course rosters.
//!
//! One CSV per course inside the `Cisco Data` folder. Files are read
//! positionally into a fixed five-column schema; a file of any other shape is
//! skipped and the rest still load. The folder is archived as a whole.

use super::{RunContext, VendorReport};
use crate::error::{IngestError, Result};
use crate::export::ExportTarget;
use crate::reader::{empty_text_frame, load_csv};
use polars::prelude::*;
use std::path::Path;

pub const FOLDER: &str = "Cisco Data";
pub const TABLE: &str = "zEnrolmentData_Cisco";

pub const COURSE_COLUMN: &str = "courses";
pub const ROSTER_COLUMNS: [&str; 5] = ["NAME", "EMAIL", "INVITATION DATE", "STATUS", "ENROLLMENT DATE"];

/// Length of the export suffix appended to every course name.
const COURSE_SUFFIX_LEN: usize = 16;

pub(super) fn ingest(ctx: &RunContext<'_>, report: &mut VendorReport) -> Result<()> {
    let folder = ctx.download_dir.join(FOLDER);
    if !folder.is_dir() {
        return Err(IngestError::MissingArtifact(FOLDER.to_owned()));
    }

    let rosters = load_rosters(&folder)?;
    ctx.export(&rosters, ExportTarget::create(TABLE), report);
    ctx.archive(&folder, report)
}

/// Stack every readable roster in `folder`, in file-name order, behind a
/// leading course column.
///
/// # Errors
///
/// Returns error if the folder cannot be listed. Individual bad files are
/// logged and skipped.
pub fn load_rosters(folder: &Path) -> Result<DataFrame> {
    let mut names = std::fs::read_dir(folder)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();

    let mut output_columns = vec![COURSE_COLUMN];
    output_columns.extend(ROSTER_COLUMNS);
    let mut rosters = empty_text_frame(&output_columns)?;

    for name in names {
        match load_roster(&folder.join(&name)) {
            Ok(roster) => {
                tracing::debug!("{name}: {} enrolments", roster.height());
                rosters.vstack_mut(&roster)?;
            }
            Err(e) => {
                tracing::warn!("{name} does not match format: {e}");
            }
        }
    }

    rosters.as_single_chunk();
    Ok(rosters)
}

fn load_roster(path: &Path) -> Result<DataFrame> {
    let mut df = load_csv(path)?;
    if df.width() != ROSTER_COLUMNS.len() {
        return Err(IngestError::StructuralMismatch(format!(
            "expected {} columns, found {}",
            ROSTER_COLUMNS.len(),
            df.width()
        )));
    }
    df.set_column_names(ROSTER_COLUMNS)?;

    let course = course_name(path);
    let course_column = Column::new(COURSE_COLUMN.into(), vec![course.as_str(); df.height()]);
    df.insert_column(0, course_column)?;
    Ok(df)
}

/// File stem without its trailing export suffix; empty when the stem is
/// shorter than the suffix.
fn course_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let keep = stem.chars().count().saturating_sub(COURSE_SUFFIX_LEN);
    stem.chars().take(keep).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "Name,Email,Invited,Status,Enrolled\n\
        Ann,ann@x.org,2024-01-01,Active,2024-01-02\n\
        Bob,bob@x.org,2024-01-01,Invited,\n";

    #[test]
    fn test_course_name_strips_suffix() {
        assert_eq!(
            course_name(Path::new("Cisco Data/Intro to Cybersecurity_students_roster.csv")),
            "Intro to Cybersecurity"
        );
        assert_eq!(course_name(Path::new("short.csv")), "");
    }

    #[test]
    fn test_bad_file_is_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("Networking Basics_students_roster.csv"), ROSTER)?;
        std::fs::write(
            dir.path().join("Python Essentials_students_roster.csv"),
            "Name,Email,Status\nCy,cy@x.org,Active\n",
        )?;
        std::fs::write(dir.path().join("Linux Unhatched_students_roster.csv"), ROSTER)?;

        let rosters = load_rosters(dir.path())?;
        assert_eq!(rosters.shape(), (4, 6));

        let names: Vec<&str> = rosters.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec!["courses", "NAME", "EMAIL", "INVITATION DATE", "STATUS", "ENROLLMENT DATE"]
        );

        let courses: Vec<Option<&str>> = rosters.column(COURSE_COLUMN)?.str()?.into_iter().collect();
        assert_eq!(
            courses,
            vec![
                Some("Linux Unhatched"),
                Some("Linux Unhatched"),
                Some("Networking Basics"),
                Some("Networking Basics")
            ]
        );
        assert_eq!(rosters.column("ENROLLMENT DATE")?.null_count(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_folder_gives_empty_schema() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let rosters = load_rosters(dir.path())?;
        assert_eq!(rosters.shape(), (0, 6));
        Ok(())
    }
}
