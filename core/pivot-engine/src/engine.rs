//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - The calculation core that transforms records into a renderable result.
//!
//! This module takes a RecordSet (data) and a PivotRequest (layout) and
//! produces a PivotResult (table ready for rendering).
//!
//! Algorithm:
//! 1. Optionally limit the input to a bounded set of column combinations
//! 2. Aggregate the records into the flat row × column table
//! 3. Interleave subtotal rows, then derive the grand total
//! 4. Build the column header grid and the row-span metadata
//!
//! The computation is a pure function of its inputs: every call owns its own
//! working data and either returns the complete result or nothing.

use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, info};

use crate::aggregate::aggregate;
use crate::config::EngineConfig;
use crate::definition::{PivotRequest, RecordSet};
use crate::error::{PivotError, Result};
use crate::estimate::limit_columns;
use crate::header::build_header_rows;
use crate::span::compute_row_spans;
use crate::totals::{grand_total, insert_subtotals};
use crate::view::PivotResult;

// ============================================================================
// CALCULATOR
// ============================================================================

/// Runs the pipeline for one (records, request) snapshot.
pub struct PivotCalculator<'a> {
    records: &'a RecordSet,
    request: &'a PivotRequest,
    config: &'a EngineConfig,
}

impl<'a> PivotCalculator<'a> {
    pub fn new(records: &'a RecordSet, request: &'a PivotRequest, config: &'a EngineConfig) -> Self {
        PivotCalculator {
            records,
            request,
            config,
        }
    }

    /// Computes the full result. With `limit` set, records outside the kept
    /// column combinations are dropped first and the limiter's report is
    /// attached to the result.
    pub fn calculate(&self, limit: bool) -> PivotResult {
        let request = self.request;

        let limited;
        let (records, column_limit_info) = if limit && !request.column_fields.is_empty() {
            let outcome = limit_columns(
                self.records,
                &request.column_fields,
                &request.values,
                self.config,
            );
            limited = outcome.records;
            (&limited, Some(outcome.info))
        } else {
            (self.records, None)
        };

        if records.is_empty() {
            debug!(target: "PIVOT", "no records, returning empty result");
            let mut result = PivotResult::empty(request);
            result.column_limit_info = column_limit_info;
            return result;
        }

        let row_field_count = request.row_fields.len();
        let table = aggregate(records, request);
        let column_count = table.col_keys.len();

        let rows = insert_subtotals(table.rows, row_field_count, column_count, self.config);
        let grand_total = grand_total(&rows, row_field_count, column_count, self.config);
        let header_rows = build_header_rows(
            &table.col_keys,
            request.column_fields.len(),
            !request.is_presence_only(),
        );
        let row_spans = compute_row_spans(&rows, row_field_count);

        info!(
            target: "PIVOT",
            "calculated pivot: {} records -> {} rows x {} columns",
            records.len(),
            rows.len(),
            column_count
        );

        PivotResult {
            row_groups: request.row_fields.clone(),
            col_groups: request.column_fields.clone(),
            leaf_cols: table.col_keys,
            col_agg_info: table.col_agg_info,
            rows,
            grand_total,
            header_rows,
            row_spans,
            column_limit_info,
        }
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Calculates a pivot table from records and a layout.
pub fn calculate_pivot(
    records: &RecordSet,
    request: &PivotRequest,
    config: &EngineConfig,
    limit_columns: bool,
) -> PivotResult {
    PivotCalculator::new(records, request, config).calculate(limit_columns)
}

/// Calculates a pivot without letting a failure escape the engine boundary.
///
/// A request with no fields in any area yields an empty result. A panic
/// inside the computation is caught and reported as
/// [`PivotError::Computation`].
pub fn safe_calculate_pivot(
    records: &RecordSet,
    request: &PivotRequest,
    config: &EngineConfig,
    limit_columns: bool,
) -> Result<PivotResult> {
    if request.is_empty() {
        debug!(target: "PIVOT", "no fields configured, returning empty result");
        return Ok(PivotResult::empty(request));
    }

    panic::catch_unwind(AssertUnwindSafe(|| {
        calculate_pivot(records, request, config, limit_columns)
    }))
    .map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!(target: "PIVOT", "pivot computation failed: {}", message);
        PivotError::Computation(message)
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
