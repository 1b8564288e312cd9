//! Wide-to-long extraction of repeated column groups.
//!
//! A wide export holds one row per learner and repeats a block of columns per
//! record instance:
//!
//! ```text
//! Learner Email | Course Name | Class 1 | % attended 1 | ... | Class 2 | % attended 2 | ...
//! ```
//!
//! A column starts a group occurrence when its name, minus the trailing
//! space-delimited token, equals a [`ColumnGroupSpec::prefix`]. The occurrence
//! spans `width` columns from there. Each occurrence becomes a block of rows
//! with the group's canonical names plus the two join columns, keeping only the
//! rows whose anchor (first) cell is present. Blocks of the same group are
//! stacked in the order their columns appear.

use crate::error::{IngestError, Result};
use crate::reader::empty_text_frame;
use polars::prelude::*;

/// Static description of one repeated column group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnGroupSpec {
    /// Name of the anchor column without its index, e.g. `"Class"`.
    pub prefix: &'static str,
    /// Canonical output names, one per column in the group.
    pub columns: &'static [&'static str],
}

impl ColumnGroupSpec {
    /// Number of contiguous columns an occurrence spans.
    pub const fn width(&self) -> usize {
        self.columns.len()
    }
}

/// The groups to extract from one dataset and the columns carried along for
/// correlating the long rows back to a learner.
#[derive(Debug, Clone, Copy)]
pub struct GroupTable {
    pub groups: &'static [ColumnGroupSpec],
    pub join_columns: [&'static str; 2],
}

impl GroupTable {
    /// Group whose prefix matches `column_name` with its index token removed.
    pub fn group_for(&self, column_name: &str) -> Option<&'static ColumnGroupSpec> {
        let (prefix, _index) = column_name.rsplit_once(' ')?;
        self.groups.iter().find(|group| group.prefix == prefix)
    }

    /// Output schema of a group: canonical columns then join columns.
    pub fn output_columns(&self, group: &ColumnGroupSpec) -> Vec<&'static str> {
        group
            .columns
            .iter()
            .chain(self.join_columns.iter())
            .copied()
            .collect()
    }
}

/// Long-format table produced for one group.
#[derive(Debug, Clone)]
pub struct GroupFrame {
    pub group: &'static ColumnGroupSpec,
    /// How many occurrences of the group the wide dataset contained.
    pub occurrences: usize,
    pub frame: DataFrame,
}

/// Extract every group in `table` from `wide`.
///
/// Returns one [`GroupFrame`] per entry of `table.groups`, in table order. A
/// group with no occurrences yields an empty frame with the full output
/// schema.
///
/// # Errors
///
/// Returns [`IngestError::StructuralMismatch`] if a join column is missing or
/// an occurrence runs past the last column.
pub fn reshape_groups(wide: &DataFrame, table: &GroupTable) -> Result<Vec<GroupFrame>> {
    let join = table
        .join_columns
        .iter()
        .map(|name| {
            wide.column(name).cloned().map_err(|e| {
                IngestError::StructuralMismatch(format!("join column '{name}' is missing: {e}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut outputs = table
        .groups
        .iter()
        .map(|group| {
            Ok(GroupFrame {
                group,
                occurrences: 0,
                frame: empty_text_frame(&table.output_columns(group))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let columns = wide.get_columns();
    for (start, column) in columns.iter().enumerate() {
        let Some(group) = table.group_for(column.name()) else {
            continue;
        };

        let end = start + group.width();
        let Some(block) = columns.get(start..end) else {
            return Err(IngestError::StructuralMismatch(format!(
                "group '{}' starting at column {start} needs {} columns, only {} remain",
                column.name(),
                group.width(),
                columns.len() - start
            )));
        };

        let occurrence = extract_occurrence(block, &join, group, table)?;
        tracing::debug!(
            "Column '{}' yielded {} {} rows",
            column.name(),
            occurrence.height(),
            group.prefix
        );

        if let Some(output) = outputs.iter_mut().find(|o| o.group == group) {
            output.frame.vstack_mut(&occurrence)?;
            output.occurrences += 1;
        }
    }

    for output in &mut outputs {
        output.frame.as_single_chunk();
    }

    Ok(outputs)
}

/// Slice one occurrence, rename it to the canonical schema and drop rows
/// without an anchor value.
fn extract_occurrence(
    block: &[Column],
    join: &[Column],
    group: &ColumnGroupSpec,
    table: &GroupTable,
) -> Result<DataFrame> {
    let renamed = block
        .iter()
        .chain(join.iter())
        .zip(table.output_columns(group))
        .map(|(column, name)| Ok(column.cast(&DataType::String)?.with_name(name.into())))
        .collect::<Result<Vec<_>>>()?;

    let anchor_name = group.columns.first().ok_or_else(|| {
        IngestError::StructuralMismatch(format!("group '{}' has no columns", group.prefix))
    })?;
    let occurrence = DataFrame::new(renamed)?;
    let anchor = occurrence.column(anchor_name)?.is_not_null();
    Ok(occurrence.filter(&anchor)?)
}
