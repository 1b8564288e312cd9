//! Linux Foundation usage workbook.

use super::{RunContext, VendorReport};
use crate::error::Result;
use crate::export::ExportTarget;
use crate::reader::load_df;

pub const LOGICAL_NAME: &str = "eLearning Client Usage.xlsx";
pub const TABLE: &str = "zEnrolmentData_Linux";

pub(super) fn ingest(ctx: &RunContext<'_>, report: &mut VendorReport) -> Result<()> {
    let source = ctx.locate(LOGICAL_NAME)?;
    let df = load_df(&source.path)?;
    ctx.export(&df, ExportTarget::create(TABLE), report);
    ctx.archive(&source.path, report)
}
