//! SimpliLearn learner activity export.
//!
//! One wide file per delivery: a fixed block of learner/course columns
//! followed by repeated assessment, project and class groups. The fixed block
//! becomes the enrolment table; each group is reshaped into its own long
//! table keyed by learner email and course name.

use super::{RunContext, VendorReport};
use crate::error::{IngestError, Result};
use crate::export::ExportTarget;
use crate::reader::load_df;
use crate::reshape::{ColumnGroupSpec, GroupTable, reshape_groups};
use polars::prelude::*;

pub const LOGICAL_NAME: &str = "The_Commonwealth_Learner_Activity.csv";

pub const ENROLMENT_TABLE: &str = "zEnrolmentData_SimpliLearn";

/// Fixed learner/course columns projected into the enrolment table.
pub const ENROLMENT_COLUMNS: [&str; 32] = [
    "Learner Name",
    "Learner Email",
    "Account Status",
    "Order Type",
    "Team",
    "Last Login Date",
    "Last Activity On",
    "Self-Learning Time",
    "Course Assignment Date",
    "Course Activation Date",
    "Course Expiration Date",
    "Course Access",
    "Course Type",
    "Course Id",
    "Course Name",
    "Self-Learning Completion %",
    "Certificate Unlock Date",
    "Activity Level",
    "Learning days",
    "Program Id",
    "Enrolment Cohort ID",
    "Enrolment Cohort Name",
    "Current Cohort ID",
    "Current Cohort Name",
    "Current Cohort Start Date",
    "Current Cohort End Date",
    "Cohort Enrollment Date",
    "Classes Completed/Overall Classes",
    "Mentoring Registered",
    "Mentoring Attended",
    "Live Classes Registered",
    "Live Sessions Attended",
];

/// (delivered name, stored name)
pub const ENROLMENT_RENAME: (&str, &str) = ("Classes Completed/Overall Classes", "Overall Classes");

pub const ASSESSMENT: ColumnGroupSpec = ColumnGroupSpec {
    prefix: "Assessment Test",
    columns: &["Assessment Test", "Best Score", "Attempt Date"],
};

pub const PROJECT: ColumnGroupSpec = ColumnGroupSpec {
    prefix: "Project Name",
    columns: &["Project Name", "Project Result", "Attempts Count", "Submit Date"],
};

pub const CLASS: ColumnGroupSpec = ColumnGroupSpec {
    prefix: "Class",
    columns: &[
        "Class",
        "% of Sessions attended",
        "Session completed count in Class",
        "Average Time Spent Per Session in Class",
    ],
};

pub const GROUPS: GroupTable = GroupTable {
    groups: &[ASSESSMENT, PROJECT, CLASS],
    join_columns: ["Learner Email", "Course Name"],
};

/// Table for each entry of [`GROUPS`], in the same order.
pub const GROUP_TABLES: [&str; 3] = [
    "zAssessmentData_SimpliLearn",
    "zProjectData_SimpliLearn",
    "zClassData_SimpliLearn",
];

pub(super) fn ingest(ctx: &RunContext<'_>, report: &mut VendorReport) -> Result<()> {
    let source = ctx.locate(LOGICAL_NAME)?;
    let wide = load_df(&source.path)?;

    let enrolment = enrolment_frame(&wide)?;
    let groups = reshape_groups(&wide, &GROUPS)?;

    ctx.export(&enrolment, ExportTarget::create(ENROLMENT_TABLE), report);
    for (output, table) in groups.iter().zip(GROUP_TABLES) {
        tracing::debug!(
            "{} occurrences of {} give {} rows",
            output.occurrences,
            output.group.prefix,
            output.frame.height()
        );
        ctx.export(&output.frame, ExportTarget::create(table), report);
    }

    ctx.archive(&source.path, report)
}

/// Project the fixed columns and apply the stored column name.
pub fn enrolment_frame(wide: &DataFrame) -> Result<DataFrame> {
    let mut enrolment = wide.select(ENROLMENT_COLUMNS).map_err(|e| {
        IngestError::StructuralMismatch(format!("{LOGICAL_NAME} is missing a learner column: {e}"))
    })?;

    let (delivered, stored) = ENROLMENT_RENAME;
    enrolment.rename(delivered, stored.into())?;
    Ok(enrolment)
}
