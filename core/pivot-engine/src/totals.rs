//! FILENAME: core/pivot-engine/src/totals.rs
//! Subtotal and grand-total rows.
//!
//! Subtotals are inserted by recursively partitioning the data rows on each
//! row field, outermost first. Every group yields a summary: its subtotal
//! when one was emitted, otherwise its single row. A parent's subtotal merges
//! the summaries of its children, so no leaf is ever counted twice.

use std::collections::BTreeMap;

use log::debug;

use crate::config::EngineConfig;
use crate::key::join_key;
use crate::stats::{merge_rows, PivotCell};
use crate::view::{PivotRow, RowKind};

// ============================================================================
// SUBTOTALS
// ============================================================================

struct SubtotalBuilder<'a> {
    depth: usize,
    column_count: usize,
    config: &'a EngineConfig,
}

impl SubtotalBuilder<'_> {
    /// Emits `rows` grouped by their label at `level` into `out`.
    /// Returns the summary cells of the whole slice.
    fn emit_level(
        &self,
        rows: Vec<PivotRow>,
        level: usize,
        path: &mut Vec<String>,
        out: &mut Vec<PivotRow>,
    ) -> Vec<Option<PivotCell>> {
        let mut groups: BTreeMap<String, Vec<PivotRow>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.label(level).to_string()).or_default().push(row);
        }

        let mut summaries: Vec<Vec<Option<PivotCell>>> = Vec::with_capacity(groups.len());

        for (value, group) in groups {
            let start = out.len();
            path.push(value);

            let summary = if level + 1 == self.depth {
                let summary = merge_rows(group.iter().map(|r| r.cells.as_slice()), self.column_count);
                out.extend(group);
                summary
            } else {
                self.emit_level(group, level + 1, path, out)
            };

            if out.len() - start > 1 {
                out.push(self.subtotal_row(path, level, summary.clone()));
            }

            path.pop();
            summaries.push(summary);
        }

        merge_rows(summaries.iter().map(Vec::as_slice), self.column_count)
    }

    fn subtotal_row(&self, path: &[String], level: usize, cells: Vec<Option<PivotCell>>) -> PivotRow {
        let mut row_values = path.to_vec();
        row_values.resize(self.depth, String::new());

        PivotRow {
            row_key: join_key(path),
            row_values,
            cells,
            kind: RowKind::Subtotal {
                level,
                label: format!("{}{}", self.config.subtotal_prefix, path[level]),
            },
        }
    }
}

/// Interleaves subtotal rows into the flat table.
///
/// Groups are ordered lexicographically by their label at each level. A
/// subtotal follows every group that spans more than one output row.
pub fn insert_subtotals(
    rows: Vec<PivotRow>,
    row_field_count: usize,
    column_count: usize,
    config: &EngineConfig,
) -> Vec<PivotRow> {
    if row_field_count == 0 || rows.is_empty() {
        return rows;
    }

    let builder = SubtotalBuilder {
        depth: row_field_count,
        column_count,
        config,
    };

    let data_rows = rows.len();
    let mut out = Vec::with_capacity(data_rows + data_rows / 2);
    builder.emit_level(rows, 0, &mut Vec::with_capacity(row_field_count), &mut out);

    debug!(
        target: "PIVOT",
        "inserted {} subtotal rows over {} data rows",
        out.len() - data_rows,
        data_rows
    );

    out
}

// ============================================================================
// GRAND TOTAL
// ============================================================================

/// Derives the grand-total row from a subtotaled table.
///
/// Each level-0 group contributes its level-0 subtotal when it has one and
/// its data rows otherwise. Without row fields the grand total is the single
/// aggregated row itself.
pub fn grand_total(
    rows: &[PivotRow],
    row_field_count: usize,
    column_count: usize,
    config: &EngineConfig,
) -> Option<PivotRow> {
    let mut body = rows.iter().filter(|r| !r.is_grand_total()).peekable();
    body.peek()?;

    if row_field_count == 0 {
        let mut total = body.find(|r| r.is_data())?.clone();
        total.kind = RowKind::GrandTotal;
        return Some(total);
    }

    let body: Vec<&PivotRow> = body.collect();
    let mut contributions: Vec<&[Option<PivotCell>]> = Vec::new();

    for group in body.chunk_by(|a, b| a.label(0) == b.label(0)) {
        match group.iter().find(|r| r.subtotal_level() == Some(0)) {
            Some(subtotal) => contributions.push(&subtotal.cells),
            None => contributions.extend(
                group
                    .iter()
                    .filter(|r| r.is_data())
                    .map(|r| r.cells.as_slice()),
            ),
        }
    }

    let mut row_values = vec![String::new(); row_field_count];
    row_values[0] = config.grand_total_label.clone();

    Some(PivotRow {
        row_key: config.grand_total_label.clone(),
        row_values,
        cells: merge_rows(contributions, column_count),
        kind: RowKind::GrandTotal,
    })
}
