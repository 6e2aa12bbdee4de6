//! FILENAME: core/pivot-engine/src/error.rs

use thiserror::Error;

use crate::definition::AggregationType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PivotError {
    #[error("Pivot computation failed: {0}")]
    Computation(String),

    #[error("Cannot {action} while the session is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Aggregation '{aggregation}' is not supported for non-numeric field '{field}'")]
    UnsupportedAggregation {
        field: String,
        aggregation: AggregationType,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),
}

pub type Result<T> = std::result::Result<T, PivotError>;
