//! FILENAME: core/pivot-engine/src/stats.rs
//! Per-cell statistics.
//!
//! A cell keeps {raw count, valid count, sum, min, max} rather than a final
//! value. Sum/count/min/max compose associatively, so subtotals and the
//! grand total are derived by merging child stats; the average is never
//! stored and is always re-derived as `sum / valid_count`.

use serde::{Deserialize, Serialize};

use crate::definition::{AggregationType, RecordValue};

// ============================================================================
// CELL STATS
// ============================================================================

/// Summary of the values falling into one pivot cell.
///
/// `sum`, `min` and `max` are `None` exactly when `valid_count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStats {
    /// Records in the cell, including values that are not numbers.
    pub raw_count: u64,
    /// Records whose value coerced to a finite number.
    pub valid_count: u64,
    pub sum: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl CellStats {
    /// Average of the valid values, `None` when there are none.
    pub fn avg(&self) -> Option<f64> {
        if self.valid_count == 0 {
            return None;
        }
        self.sum.map(|s| s / self.valid_count as f64)
    }

    /// The value displayed for an aggregation.
    pub fn value(&self, aggregation: AggregationType) -> Option<f64> {
        match aggregation {
            AggregationType::Sum => self.sum,
            AggregationType::Average => self.avg(),
            AggregationType::Count => Some(self.raw_count as f64),
            AggregationType::Min => self.min,
            AggregationType::Max => self.max,
        }
    }

    /// Folds another cell's stats into this one.
    /// A child without valid values only contributes to `raw_count`.
    pub fn merge(&mut self, other: &CellStats) {
        self.raw_count += other.raw_count;

        if other.valid_count == 0 {
            return;
        }

        self.valid_count += other.valid_count;
        self.sum = Some(self.sum.unwrap_or(0.0) + other.sum.unwrap_or(0.0));
        if let Some(other_min) = other.min {
            self.min = Some(self.min.map_or(other_min, |m| m.min(other_min)));
        }
        if let Some(other_max) = other.max {
            self.max = Some(self.max.map_or(other_max, |m| m.max(other_max)));
        }
    }

    /// Checks the count and null invariants.
    pub fn is_consistent(&self) -> bool {
        let nulls_match = (self.valid_count == 0)
            == self.sum.is_none()
            && self.sum.is_none() == self.min.is_none()
            && self.min.is_none() == self.max.is_none();
        self.valid_count <= self.raw_count && nulls_match
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Accumulator for computing cell stats incrementally.
#[derive(Debug, Clone, Default)]
pub struct CellStatsAccumulator {
    raw_count: u64,
    valid_count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl CellStatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record's value. Values that do not coerce to a finite number
    /// are only counted in `raw_count`.
    pub fn add(&mut self, value: &RecordValue) {
        self.raw_count += 1;

        if let Some(n) = value.as_number() {
            self.valid_count += 1;
            self.sum += n;
            self.min = Some(self.min.map_or(n, |m| m.min(n)));
            self.max = Some(self.max.map_or(n, |m| m.max(n)));
        }
    }

    pub fn finish(&self) -> CellStats {
        if self.valid_count == 0 {
            return CellStats {
                raw_count: self.raw_count,
                ..CellStats::default()
            };
        }

        CellStats {
            raw_count: self.raw_count,
            valid_count: self.valid_count,
            sum: Some(self.sum),
            min: self.min,
            max: self.max,
        }
    }
}

/// Computes the stats of a field over a set of record values.
pub fn compute_stats<'a, I>(values: I) -> CellStats
where
    I: IntoIterator<Item = &'a RecordValue>,
{
    let mut acc = CellStatsAccumulator::new();
    for value in values {
        acc.add(value);
    }
    acc.finish()
}

// ============================================================================
// PIVOT CELL
// ============================================================================

/// Content of a populated pivot cell. An absent cell is `None` in the row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "stats", rename_all = "camelCase")]
pub enum PivotCell {
    /// Aggregated statistics for a value pivot.
    Stats(CellStats),
    /// Presence marker for a pivot without value fields.
    Present,
}

impl PivotCell {
    pub fn stats(&self) -> Option<&CellStats> {
        match self {
            PivotCell::Stats(stats) => Some(stats),
            PivotCell::Present => None,
        }
    }

    /// Merges a list of cells: stats are merged, a presence marker survives if
    /// any child is present, and all-absent children give an absent cell.
    pub fn merge_all<'a, I>(cells: I) -> Option<PivotCell>
    where
        I: IntoIterator<Item = &'a Option<PivotCell>>,
    {
        let mut merged: Option<PivotCell> = None;

        for cell in cells.into_iter().flatten() {
            merged = Some(match (merged, cell) {
                (None, cell) => *cell,
                (Some(PivotCell::Stats(mut acc)), PivotCell::Stats(stats)) => {
                    acc.merge(stats);
                    PivotCell::Stats(acc)
                }
                (Some(PivotCell::Stats(acc)), PivotCell::Present) => PivotCell::Stats(acc),
                (Some(PivotCell::Present), other) => *other,
            });
        }

        merged
    }
}

/// Merges rows of cells column by column.
pub fn merge_rows<'a, I>(rows: I, column_count: usize) -> Vec<Option<PivotCell>>
where
    I: IntoIterator<Item = &'a [Option<PivotCell>]>,
{
    let rows: Vec<&[Option<PivotCell>]> = rows.into_iter().collect();
    (0..column_count)
        .map(|col| PivotCell::merge_all(rows.iter().filter_map(|r| r.get(col))))
        .collect()
}
