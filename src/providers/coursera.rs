//! Coursera delivers three independent reports, exported verbatim.

use super::{RunContext, VendorReport};
use crate::error::Result;
use crate::export::ExportTarget;
use crate::reader::load_df;

/// Logical report name and the table it lands in.
pub const REPORTS: [(&str, &str); 3] = [
    ("membership-report.csv", "zMembershipData_Coursera"),
    ("usage-report.csv", "zEnrolmentData_Coursera"),
    ("specialization-report.csv", "zSpecializationData_Coursera"),
];

/// All three reports must be present before any is read.
pub(super) fn ingest(ctx: &RunContext<'_>, report: &mut VendorReport) -> Result<()> {
    let sources = REPORTS
        .iter()
        .map(|(logical_name, table)| Ok((ctx.locate(logical_name)?, *table)))
        .collect::<Result<Vec<_>>>()?;

    for (source, table) in &sources {
        let df = load_df(&source.path)?;
        ctx.export(&df, ExportTarget::create(table), report);
    }

    for (source, _) in &sources {
        ctx.archive(&source.path, report)?;
    }
    Ok(())
}
