//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot Table subsystem.
//!
//! This crate turns a flat collection of typed records into a pivot table:
//! row groups, column groups, aggregated value cells, recursive subtotals and
//! a grand total, plus the header and row-span metadata a renderer needs.
//!
//! Layers:
//! - `definition`: Records and the pivot request (what to compute)
//! - `key`, `stats`, `aggregate`: Grouping and per-cell statistics
//! - `totals`, `header`, `span`: Subtotals, grand total and render metadata
//! - `estimate`: Cardinality guard and column limiting
//! - `schema`: Field-role inference for aggregation gating
//! - `view`: Renderable output for the frontend (WHAT we display)
//! - `engine`: Calculation pipeline (HOW we calculate)
//! - `session`: Estimation/approval/computation state machine

pub mod aggregate;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod header;
pub mod key;
pub mod schema;
pub mod session;
pub mod span;
pub mod stats;
pub mod totals;
pub mod view;

pub use aggregate::{aggregate, FlatTable};
pub use config::EngineConfig;
pub use definition::*;
pub use engine::{calculate_pivot, safe_calculate_pivot, PivotCalculator};
pub use error::{PivotError, Result};
pub use estimate::{
    estimate_columns, limit_columns, CardinalityEstimate, ColumnLimit, ColumnLimitInfo,
};
pub use header::{build_header_rows, HeaderCell};
pub use key::{KeyBuilder, KEY_SEPARATOR, MISSING_LABEL, TOTAL_ROW_KEY};
pub use schema::{infer_field_role, infer_schema, FieldInfo, FieldRole};
pub use session::{ComputeOutcome, ComputeState, ComputeTicket, ConfigKey, PivotSession, Step};
pub use span::{compute_row_spans, RowSpanInfo};
pub use stats::{compute_stats, CellStats, CellStatsAccumulator, PivotCell};
pub use totals::{grand_total, insert_subtotals};
pub use view::*;
