//! FILENAME: core/pivot-engine/src/aggregate.rs
//! Aggregator - builds the flat row-key × column-key table.
//!
//! Algorithm:
//! 1. Single pass over the records: compute the row key and column key
//!    base, bucket the record index under (row, leaf column) once per value
//!    spec
//! 2. Sort the distinct leaf column keys lexicographically
//! 3. Compute the stats (or presence marker) of every populated bucket
//!
//! Rows keep the order in which their keys were first seen.

use std::collections::BTreeMap;

use log::debug;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::definition::{AggregationSpec, PivotRequest, RecordSet};
use crate::key::{column_key, KeyBuilder};
use crate::stats::{compute_stats, PivotCell};
use crate::view::PivotRow;

/// Record indices that fell into one (row, column) bucket.
type Bucket = SmallVec<[usize; 4]>;

/// The un-subtotaled output of the aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    /// Data rows in first-seen order.
    pub rows: Vec<PivotRow>,
    /// Distinct leaf column keys, sorted.
    pub col_keys: Vec<String>,
    /// Aggregation behind each leaf column key.
    pub col_agg_info: BTreeMap<String, AggregationSpec>,
}

/// A leaf column discovered during the pass.
struct LeafColumn {
    key: String,
    /// Index into the distinct value specs (`None` for presence-only).
    value: Option<usize>,
}

/// Aggregates `records` into one row per distinct row key and one column per
/// distinct leaf column key.
pub fn aggregate(records: &RecordSet, request: &PivotRequest) -> FlatTable {
    let row_keys = KeyBuilder::rows(records, &request.row_fields);
    let col_keys = KeyBuilder::columns(records, &request.column_fields);
    let specs = request.distinct_values();
    let value_columns: Vec<Option<usize>> = specs
        .iter()
        .map(|spec| records.field_index(&spec.field))
        .collect();

    let mut row_index: FxHashMap<String, usize> = FxHashMap::default();
    let mut rows: Vec<PivotRow> = Vec::new();
    let mut col_index: FxHashMap<String, usize> = FxHashMap::default();
    let mut columns: Vec<LeafColumn> = Vec::new();
    let mut buckets: FxHashMap<(usize, usize), Bucket> = FxHashMap::default();

    let mut intern_column = |key: String, value: Option<usize>| -> usize {
        if let Some(&id) = col_index.get(&key) {
            return id;
        }
        let id = columns.len();
        col_index.insert(key.clone(), id);
        columns.push(LeafColumn { key, value });
        id
    };

    for (record_idx, record) in records.rows().enumerate() {
        let row_key = row_keys.key(record);
        let row_id = match row_index.get(&row_key) {
            Some(&id) => id,
            None => {
                let id = rows.len();
                rows.push(PivotRow::data(row_key.clone(), row_keys.labels(record), 0));
                row_index.insert(row_key, id);
                id
            }
        };

        let base = (!col_keys.is_empty()).then(|| col_keys.key(record));

        if specs.is_empty() {
            // Presence-only pivot: without column fields there is nothing to mark.
            if let Some(base) = base {
                let col_id = intern_column(column_key(Some(base.as_str()), None), None);
                buckets
                    .entry((row_id, col_id))
                    .or_default()
                    .push(record_idx);
            }
            continue;
        }

        for (value_idx, spec) in specs.iter().enumerate() {
            let col_id = intern_column(column_key(base.as_deref(), Some(*spec)), Some(value_idx));
            buckets
                .entry((row_id, col_id))
                .or_default()
                .push(record_idx);
        }
    }

    // Lexicographic column order, independent of first-seen order
    let mut order: Vec<usize> = (0..columns.len()).collect();
    order.sort_by(|&a, &b| columns[a].key.cmp(&columns[b].key));
    let mut position = vec![0usize; columns.len()];
    for (pos, &id) in order.iter().enumerate() {
        position[id] = pos;
    }

    for row in &mut rows {
        row.cells = vec![None; columns.len()];
    }

    for ((row_id, col_id), bucket) in buckets {
        let column = &columns[col_id];
        let cell = match column.value {
            None => PivotCell::Present,
            Some(value_idx) => {
                let field = value_columns[value_idx];
                PivotCell::Stats(compute_stats(
                    bucket.iter().map(|&i| records.value(i, field)),
                ))
            }
        };
        rows[row_id].cells[position[col_id]] = Some(cell);
    }

    let col_agg_info: BTreeMap<String, AggregationSpec> = columns
        .iter()
        .filter_map(|c| c.value.map(|v| (c.key.clone(), specs[v].clone())))
        .collect();

    let col_keys: Vec<String> = order.into_iter().map(|id| columns[id].key.clone()).collect();

    debug!(
        target: "PIVOT",
        "aggregated {} records into {} rows x {} columns",
        records.len(),
        rows.len(),
        col_keys.len()
    );

    FlatTable {
        rows,
        col_keys,
        col_agg_info,
    }
}
