//! FILENAME: core/pivot-engine/src/header.rs
//! Hierarchical column headers.
//!
//! Each leaf column key is split back into one label per column field plus
//! the trailing value label. Header row `L` merges adjacent leaves whose
//! labels agree at every level up to and including `L`.

use serde::{Deserialize, Serialize};

use crate::key::KEY_SEPARATOR;

/// One merged header cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub label: String,
    /// Number of leaf columns under this header (always >= 1).
    pub col_span: usize,
}

impl HeaderCell {
    pub fn new(label: impl Into<String>) -> Self {
        HeaderCell {
            label: label.into(),
            col_span: 1,
        }
    }
}

/// Splits a leaf key into its positional labels.
///
/// A value label (`field(agg)`) is split off the end first, so separators
/// inside column values only ever spill into the last column level.
fn leaf_labels(key: &str, column_field_count: usize, has_values: bool) -> Vec<&str> {
    let (base, value_label) = if has_values {
        match key.rsplit_once(KEY_SEPARATOR) {
            Some((base, tag)) => (base, Some(tag)),
            None => ("", Some(key)),
        }
    } else {
        (key, None)
    };

    let mut labels: Vec<&str> = base.splitn(column_field_count, KEY_SEPARATOR).collect();
    labels.resize(column_field_count, "");
    labels.extend(value_label);
    labels
}

/// Builds the header grid for the sorted leaf columns.
///
/// With column fields there is one row per field plus one for the value
/// labels when value fields exist. Without column fields a single row holds
/// one cell per leaf.
pub fn build_header_rows(
    leaf_cols: &[String],
    column_field_count: usize,
    has_values: bool,
) -> Vec<Vec<HeaderCell>> {
    if leaf_cols.is_empty() {
        return Vec::new();
    }

    if column_field_count == 0 {
        return vec![leaf_cols.iter().map(|key| HeaderCell::new(key.as_str())).collect()];
    }

    let parsed: Vec<Vec<&str>> = leaf_cols
        .iter()
        .map(|key| leaf_labels(key, column_field_count, has_values))
        .collect();
    let levels = column_field_count + usize::from(has_values);

    (0..levels)
        .map(|level| {
            let mut cells: Vec<HeaderCell> = Vec::new();
            for (i, labels) in parsed.iter().enumerate() {
                let continues = i > 0 && parsed[i - 1][..=level] == labels[..=level];
                match cells.last_mut() {
                    Some(last) if continues => last.col_span += 1,
                    _ => cells.push(HeaderCell::new(labels[level])),
                }
            }
            cells
        })
        .collect()
}
