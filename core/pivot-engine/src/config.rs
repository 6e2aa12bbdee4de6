//! FILENAME: core/pivot-engine/src/config.rs
//! Engine configuration: thresholds for the cardinality guard and the labels
//! used for synthetic rows.
//!
//! Every field has a serde default so a partial JSON/TOML document (or none
//! at all) yields a usable configuration.

use serde::{Deserialize, Serialize};

/// Tunables shared by every stage of a pivot computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Estimated column count above which the caller is asked for approval.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: usize,

    /// Maximum number of records the cardinality estimator inspects.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Column budget applied when the caller accepts a cardinality warning.
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,

    /// Lower bound on the column combinations kept by the limiter.
    #[serde(default = "default_min_columns")]
    pub min_columns: usize,

    /// Number of non-null values sampled when inferring a field role.
    #[serde(default = "default_role_sample_size")]
    pub role_sample_size: usize,

    /// Share of sampled values that must parse for a numeric/date role.
    #[serde(default = "default_role_ratio")]
    pub role_ratio: f64,

    /// Prefix of subtotal labels ("Total East").
    #[serde(default = "default_subtotal_prefix")]
    pub subtotal_prefix: String,

    /// Label placed on the first row-group column of the grand total.
    #[serde(default = "default_grand_total_label")]
    pub grand_total_label: String,

    /// Text shown for cells without a numeric value.
    #[serde(default = "default_empty_cell_text")]
    pub empty_cell_text: String,
}

fn default_warning_threshold() -> usize {
    1000
}

fn default_sample_size() -> usize {
    10_000
}

fn default_max_columns() -> usize {
    1000
}

fn default_min_columns() -> usize {
    10
}

fn default_role_sample_size() -> usize {
    100
}

fn default_role_ratio() -> f64 {
    0.8
}

fn default_subtotal_prefix() -> String {
    "Total ".to_string()
}

fn default_grand_total_label() -> String {
    "Grand Total".to_string()
}

fn default_empty_cell_text() -> String {
    "—".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            warning_threshold: default_warning_threshold(),
            sample_size: default_sample_size(),
            max_columns: default_max_columns(),
            min_columns: default_min_columns(),
            role_sample_size: default_role_sample_size(),
            role_ratio: default_role_ratio(),
            subtotal_prefix: default_subtotal_prefix(),
            grand_total_label: default_grand_total_label(),
            empty_cell_text: default_empty_cell_text(),
        }
    }
}

impl EngineConfig {
    /// Number of column combinations the limiter keeps for `value_count`
    /// value specs (at least `min_columns`).
    pub fn kept_combinations(&self, value_count: usize) -> usize {
        self.min_columns.max(self.max_columns / value_count.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "warning_threshold": 50 }"#).unwrap();
        assert_eq!(config.warning_threshold, 50);
        assert_eq!(config.sample_size, 10_000);
        assert_eq!(config.subtotal_prefix, "Total ");
    }

    #[test]
    fn test_kept_combinations() {
        let config = EngineConfig::default();
        assert_eq!(config.kept_combinations(0), 1000);
        assert_eq!(config.kept_combinations(3), 333);
        // Floor of ten combinations even with many value specs
        assert_eq!(config.kept_combinations(500), 10);
    }
}
