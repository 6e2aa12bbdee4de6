//! FILENAME: core/pivot-engine/src/span.rs
//! Vertical merge spans for the row-group columns.
//!
//! For row-group level `L`, contiguous data rows sharing identical labels at
//! levels `0..=L` merge into one cell: the first row of the run gets
//! `span = run length`, the others `span = 0`. Subtotal and grand-total rows
//! break runs on both sides.

use serde::{Deserialize, Serialize};

use crate::view::{PivotRow, RowKind};

/// Merge information for one (row, row-group level) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpanInfo {
    /// Rows merged starting here; 0 marks a covered cell that is not rendered.
    pub span: usize,
    pub is_subtotal: bool,
    /// Row-group level of the cell, or the closed level for total rows.
    pub level: usize,
}

/// Spans of a total row: one visible cell at the level it closes.
fn total_row_spans(level: usize, depth: usize) -> Vec<RowSpanInfo> {
    (0..depth)
        .map(|l| RowSpanInfo {
            span: usize::from(l == level),
            is_subtotal: true,
            level,
        })
        .collect()
}

fn same_path(a: &PivotRow, b: &PivotRow, level: usize) -> bool {
    (0..=level).all(|l| a.label(l) == b.label(l))
}

/// Computes `spans[row][level]` for a visible slice of the table.
pub fn compute_row_spans(rows: &[PivotRow], row_field_count: usize) -> Vec<Vec<RowSpanInfo>> {
    let mut spans: Vec<Vec<RowSpanInfo>> = rows
        .iter()
        .map(|row| match row.kind {
            RowKind::Data => Vec::with_capacity(row_field_count),
            RowKind::Subtotal { level, .. } => total_row_spans(level, row_field_count),
            RowKind::GrandTotal => total_row_spans(0, row_field_count),
        })
        .collect();

    for level in 0..row_field_count {
        let mut start = 0;
        while start < rows.len() {
            if !rows[start].is_data() {
                start += 1;
                continue;
            }

            let mut end = start + 1;
            while end < rows.len()
                && rows[end].is_data()
                && same_path(&rows[start], &rows[end], level)
            {
                end += 1;
            }

            for row in start..end {
                spans[row].push(RowSpanInfo {
                    span: if row == start { end - start } else { 0 },
                    is_subtotal: false,
                    level,
                });
            }
            start = end;
        }
    }

    spans
}
