//! FILENAME: core/pivot-engine/src/view.rs
//! Pivot View - Renderable output for the frontend.
//!
//! This module holds the table the engine hands to the renderer:
//! - Rows tagged as data, subtotal or grand total
//! - Leaf column keys with their aggregation info
//! - Hierarchical header rows and row-span metadata for merged cells

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::definition::{AggregationSpec, PivotRequest};
use crate::estimate::ColumnLimitInfo;
use crate::header::HeaderCell;
use crate::span::RowSpanInfo;
use crate::stats::PivotCell;

/// Text shown for a presence-only cell.
pub const PRESENT_MARKER: &str = "✓";

// ============================================================================
// ROWS
// ============================================================================

/// The type of a row in the pivot table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RowKind {
    /// Regular grouped row.
    Data,
    /// Summary of a group; `level` indexes the row field the group closes.
    Subtotal { level: usize, label: String },
    /// Summary of the whole table.
    GrandTotal,
}

/// A single row of the pivot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    /// Composite row key (`TOTAL` without row fields).
    pub row_key: String,

    /// One label per row field. Subtotal rows carry their group path and
    /// empty labels below it.
    pub row_values: Vec<String>,

    /// One entry per leaf column, aligned with `PivotResult::leaf_cols`.
    pub cells: Vec<Option<PivotCell>>,

    pub kind: RowKind,
}

impl PivotRow {
    pub fn data(row_key: String, row_values: Vec<String>, column_count: usize) -> Self {
        PivotRow {
            row_key,
            row_values,
            cells: vec![None; column_count],
            kind: RowKind::Data,
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind == RowKind::Data
    }

    pub fn is_subtotal(&self) -> bool {
        matches!(self.kind, RowKind::Subtotal { .. })
    }

    pub fn is_grand_total(&self) -> bool {
        self.kind == RowKind::GrandTotal
    }

    /// The row-field level a subtotal row closes.
    pub fn subtotal_level(&self) -> Option<usize> {
        match self.kind {
            RowKind::Subtotal { level, .. } => Some(level),
            _ => None,
        }
    }

    /// Label at a row-group level ("" when the level is absent).
    pub fn label(&self, level: usize) -> &str {
        self.row_values.get(level).map(String::as_str).unwrap_or("")
    }

    pub fn cell(&self, col: usize) -> Option<&PivotCell> {
        self.cells.get(col).and_then(Option::as_ref)
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// The complete output of one pivot computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResult {
    pub row_groups: Vec<String>,
    pub col_groups: Vec<String>,

    /// Leaf column keys, sorted lexicographically.
    pub leaf_cols: Vec<String>,

    /// Aggregation behind each leaf column (empty for presence-only pivots).
    pub col_agg_info: BTreeMap<String, AggregationSpec>,

    /// Data rows interleaved with subtotal rows.
    pub rows: Vec<PivotRow>,

    pub grand_total: Option<PivotRow>,

    /// One header row per column field, plus one for the value labels.
    pub header_rows: Vec<Vec<HeaderCell>>,

    /// `row_spans[row][level]`, aligned with `rows`.
    pub row_spans: Vec<Vec<RowSpanInfo>>,

    /// Present when the input was truncated to bound the column count.
    pub column_limit_info: Option<ColumnLimitInfo>,
}

impl PivotResult {
    /// A result with no rows or columns for the given layout.
    pub fn empty(request: &PivotRequest) -> Self {
        PivotResult {
            row_groups: request.row_fields.clone(),
            col_groups: request.column_fields.clone(),
            leaf_cols: Vec::new(),
            col_agg_info: BTreeMap::new(),
            rows: Vec::new(),
            grand_total: None,
            header_rows: Vec::new(),
            row_spans: Vec::new(),
            column_limit_info: None,
        }
    }

    /// Position of a leaf column key.
    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.leaf_cols
            .binary_search_by(|probe| probe.as_str().cmp(key))
            .ok()
    }

    /// Looks up a cell by row index and leaf column key.
    pub fn cell(&self, row: usize, key: &str) -> Option<&PivotCell> {
        let col = self.column_index(key)?;
        self.rows.get(row)?.cell(col)
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().filter(|r| r.is_data())
    }

    pub fn subtotal_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().filter(|r| r.is_subtotal())
    }

    /// Display text for one cell of `row`.
    ///
    /// Stats cells show the value of the column's aggregation; a missing
    /// value (no valid numbers, or no records) shows `empty_cell_text`,
    /// never a spurious zero.
    pub fn display_value(&self, row: &PivotRow, col: usize, config: &EngineConfig) -> String {
        let value = match row.cell(col) {
            None => None,
            Some(PivotCell::Present) => return PRESENT_MARKER.to_string(),
            Some(PivotCell::Stats(stats)) => {
                let aggregation = self
                    .leaf_cols
                    .get(col)
                    .and_then(|key| self.col_agg_info.get(key))
                    .map(|spec| spec.aggregation)
                    .unwrap_or_default();
                stats.value(aggregation)
            }
        };

        value
            .map(format_number)
            .unwrap_or_else(|| config.empty_cell_text.clone())
    }
}

/// Formats a number with at most two decimals, trimming trailing zeros.
pub fn format_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
