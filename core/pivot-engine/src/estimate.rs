//! FILENAME: core/pivot-engine/src/estimate.rs
//! Cardinality guard: estimate the column count before computing, and
//! truncate the input to a bounded set of column combinations when the
//! caller accepts the warning.

use std::collections::BTreeSet;

use log::{debug, info};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::definition::{AggregationSpec, RecordSet};
use crate::key::KeyBuilder;

// ============================================================================
// ESTIMATOR
// ============================================================================

/// Predicted size of the column axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardinalityEstimate {
    /// Estimated leaf columns (combinations × value specs).
    pub estimated_columns: usize,
    pub should_warn: bool,
    /// Estimated distinct column-field combinations.
    pub unique_column_combinations: usize,
    /// Records inspected to produce the estimate.
    pub sampled_records: usize,
}

/// Estimates how many leaf columns a pivot would produce.
///
/// Samples up to `config.sample_size` records spread evenly over the input,
/// stops as soon as the distinct count passes the warning threshold, and
/// scales the distinct count by `total / sample` when the input is larger
/// than the sample.
pub fn estimate_columns(
    records: &RecordSet,
    column_fields: &[String],
    values: &[AggregationSpec],
    config: &EngineConfig,
) -> CardinalityEstimate {
    let threshold = config.warning_threshold;
    let value_count = distinct_value_count(values);

    if column_fields.is_empty() {
        return CardinalityEstimate {
            estimated_columns: value_count,
            should_warn: value_count > threshold,
            unique_column_combinations: 1,
            sampled_records: 0,
        };
    }

    let total = records.len();
    let sample_len = total.min(config.sample_size.max(1));
    let keys = KeyBuilder::columns(records, column_fields);
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut sampled = 0;

    for i in 0..sample_len {
        // Evenly strided so sorted inputs are not judged by their head alone
        let index = if sample_len == total { i } else { i * total / sample_len };
        seen.insert(keys.key(records.row(index)));
        sampled += 1;
        if seen.len() > threshold {
            break;
        }
    }

    let distinct = seen.len();
    let combinations = if total > sample_len {
        (distinct * total).div_ceil(sample_len)
    } else {
        distinct
    };
    let estimated_columns = combinations * value_count.max(1);

    debug!(
        target: "PIVOT",
        "cardinality estimate: {} distinct in {} sampled of {} records -> {} columns",
        distinct,
        sampled,
        total,
        estimated_columns
    );

    CardinalityEstimate {
        estimated_columns,
        should_warn: estimated_columns > threshold,
        unique_column_combinations: combinations,
        sampled_records: sampled,
    }
}

// ============================================================================
// LIMITER
// ============================================================================

/// What the limiter did, for display next to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLimitInfo {
    pub columns_limited: bool,
    /// Leaf columns the full input would produce.
    pub original_columns: usize,
    /// Leaf columns after limiting.
    pub displayed_columns: usize,
}

/// The truncated input and its report.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLimit {
    pub records: RecordSet,
    pub info: ColumnLimitInfo,
}

/// Keeps only the records whose column combination is among the first
/// `config.kept_combinations(n)` combinations in sorted order, where `n` is
/// the number of distinct value specs.
///
/// Distinct combinations are counted exactly over the full input.
pub fn limit_columns(
    records: &RecordSet,
    column_fields: &[String],
    values: &[AggregationSpec],
    config: &EngineConfig,
) -> ColumnLimit {
    let value_count = distinct_value_count(values);

    if column_fields.is_empty() {
        return ColumnLimit {
            records: records.clone(),
            info: ColumnLimitInfo {
                columns_limited: false,
                original_columns: value_count,
                displayed_columns: value_count,
            },
        };
    }

    let keys = KeyBuilder::columns(records, column_fields);
    let record_keys: Vec<String> = records.rows().map(|r| keys.key(r)).collect();
    let distinct: BTreeSet<&str> = record_keys.iter().map(String::as_str).collect();

    let kept: FxHashSet<&str> = distinct
        .iter()
        .take(config.kept_combinations(value_count))
        .copied()
        .collect();

    let limited = records.filter_rows(|i| kept.contains(record_keys[i].as_str()));
    let info = ColumnLimitInfo {
        columns_limited: kept.len() < distinct.len(),
        original_columns: distinct.len() * value_count.max(1),
        displayed_columns: kept.len() * value_count.max(1),
    };

    info!(
        target: "PIVOT",
        "column limit kept {} of {} combinations ({} of {} records)",
        kept.len(),
        distinct.len(),
        limited.len(),
        records.len()
    );

    ColumnLimit {
        records: limited,
        info,
    }
}

/// Value specs that become their own leaf columns. Repeated specs share one.
fn distinct_value_count(values: &[AggregationSpec]) -> usize {
    values.iter().collect::<FxHashSet<_>>().len()
}
