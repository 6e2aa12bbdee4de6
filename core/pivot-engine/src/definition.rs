//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Definition - The inputs of a pivot computation.
//!
//! This module contains all the types needed to DESCRIBE a pivot request.
//! These structures are designed to be:
//! - Serializable (records and requests arrive from the ingestion/UI side)
//! - Immutable snapshots: a computation owns its own copy of both

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PivotError, Result};
use crate::schema::FieldInfo;

// ============================================================================
// RECORD VALUES
// ============================================================================

/// A single value inside a record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

static NULL_VALUE: RecordValue = RecordValue::Null;

impl RecordValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RecordValue::Null)
    }

    /// Coerces the value to a number. Only finite results count as valid.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            RecordValue::Null => return None,
            RecordValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            RecordValue::Number(n) => *n,
            RecordValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        n.is_finite().then_some(n)
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Null => f.write_str(crate::key::MISSING_LABEL),
            RecordValue::Bool(b) => write!(f, "{}", b),
            RecordValue::Number(n) => write!(f, "{}", n),
            RecordValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        RecordValue::Number(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        RecordValue::Number(value as f64)
    }
}

impl From<i32> for RecordValue {
    fn from(value: i32) -> Self {
        RecordValue::Number(value as f64)
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        RecordValue::Bool(value)
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Text(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::Text(value)
    }
}

impl<T: Into<RecordValue>> From<Option<T>> for RecordValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RecordValue::Null, Into::into)
    }
}

// ============================================================================
// RECORD SET
// ============================================================================

/// The flat collection of records a pivot is computed from.
///
/// Records are stored row-major against a shared field list, so a field name
/// is resolved to a column index once per request instead of once per value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    fields: Vec<String>,
    rows: Vec<Vec<RecordValue>>,
}

impl RecordSet {
    /// Creates an empty record set with a fixed field list.
    pub fn new(fields: Vec<String>) -> Self {
        RecordSet {
            fields,
            rows: Vec::new(),
        }
    }

    /// Builds a record set from field/value records.
    ///
    /// The field list is the key list of the first record. Later records
    /// missing one of those fields store `Null`; keys the first record did
    /// not have are dropped.
    pub fn from_records<I, R, K, V>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RecordValue>,
    {
        let mut records = records.into_iter();
        let Some(first) = records.next() else {
            return RecordSet::default();
        };

        let (fields, first_row): (Vec<String>, Vec<RecordValue>) = first
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();

        let positions: FxHashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut set = RecordSet::new(fields);
        set.rows.push(first_row);

        for record in records {
            let mut row = vec![RecordValue::Null; set.fields.len()];
            for (k, v) in record {
                let name: String = k.into();
                if let Some(&i) = positions.get(&name) {
                    row[i] = v.into();
                }
            }
            set.rows.push(row);
        }

        set
    }

    /// Appends a row. Values are in field order; short rows are padded with
    /// `Null` and extra values are ignored.
    pub fn push_row(&mut self, mut values: Vec<RecordValue>) {
        values.resize(self.fields.len(), RecordValue::Null);
        self.rows.push(values);
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolves a field name to its column index.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Returns the values of one record in field order.
    pub fn row(&self, index: usize) -> &[RecordValue] {
        &self.rows[index]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[RecordValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Reads a value by record index and resolved column.
    /// An unresolved column (unknown field) reads as `Null`.
    pub fn value(&self, index: usize, column: Option<usize>) -> &RecordValue {
        column
            .and_then(|c| self.rows.get(index).and_then(|row| row.get(c)))
            .unwrap_or(&NULL_VALUE)
    }

    /// Returns a new record set containing the records accepted by `keep`,
    /// which receives each record's index.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> RecordSet {
        RecordSet {
            fields: self.fields.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| keep(*i))
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }
}

/// Reads a value out of a single record by resolved column.
pub(crate) fn value_in(record: &[RecordValue], column: Option<usize>) -> &RecordValue {
    column.and_then(|c| record.get(c)).unwrap_or(&NULL_VALUE)
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Sum,
    #[serde(rename = "avg", alias = "average")]
    Average,
    Count,
    Min,
    Max,
}

impl AggregationType {
    pub const ALL: [AggregationType; 5] = [
        AggregationType::Sum,
        AggregationType::Average,
        AggregationType::Count,
        AggregationType::Min,
        AggregationType::Max,
    ];

    /// The tag used inside column keys: `sales(sum)`.
    pub fn tag(self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Average => "avg",
            AggregationType::Count => "count",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AggregationType {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationType::Sum),
            "avg" | "average" => Ok(AggregationType::Average),
            "count" => Ok(AggregationType::Count),
            "min" => Ok(AggregationType::Min),
            "max" => Ok(AggregationType::Max),
            _ => Err(PivotError::UnknownAggregation(s.to_string())),
        }
    }
}

/// A value field with its aggregation function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub field: String,

    #[serde(alias = "aggregator", alias = "agg")]
    pub aggregation: AggregationType,
}

impl AggregationSpec {
    pub fn new(field: impl Into<String>, aggregation: AggregationType) -> Self {
        AggregationSpec {
            field: field.into(),
            aggregation,
        }
    }

    /// The trailing part of a leaf column key, e.g. `sales(sum)`.
    pub fn column_tag(&self) -> String {
        format!("{}({})", self.field, self.aggregation.tag())
    }
}

impl fmt::Display for AggregationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.field, self.aggregation.tag())
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// The immutable snapshot of a pivot layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PivotRequest {
    /// Row grouping fields, outer to inner.
    #[serde(default, alias = "rowFields")]
    pub row_fields: Vec<String>,

    /// Column grouping fields, outer to inner.
    #[serde(default, alias = "columnFields", alias = "colFields")]
    pub column_fields: Vec<String>,

    /// Value fields with their aggregations.
    #[serde(default)]
    pub values: Vec<AggregationSpec>,
}

impl PivotRequest {
    pub fn new(
        row_fields: Vec<String>,
        column_fields: Vec<String>,
        values: Vec<AggregationSpec>,
    ) -> Self {
        PivotRequest {
            row_fields,
            column_fields,
            values,
        }
    }

    /// True when no field is assigned to any area.
    pub fn is_empty(&self) -> bool {
        self.row_fields.is_empty() && self.column_fields.is_empty() && self.values.is_empty()
    }

    /// A pivot without value fields only marks which combinations exist.
    pub fn is_presence_only(&self) -> bool {
        self.values.is_empty()
    }

    /// Value specs with duplicates removed, first occurrence kept.
    pub fn distinct_values(&self) -> Vec<&AggregationSpec> {
        let mut distinct: Vec<&AggregationSpec> = Vec::with_capacity(self.values.len());
        for spec in &self.values {
            if !distinct.contains(&spec) {
                distinct.push(spec);
            }
        }
        distinct
    }

    /// Checks the request against an inferred schema: every field must exist
    /// and non-numeric fields may only be counted.
    pub fn validate(&self, schema: &[FieldInfo]) -> Result<()> {
        let lookup = |name: &str| {
            schema
                .iter()
                .find(|f| f.name == name)
                .ok_or_else(|| PivotError::UnknownField(name.to_string()))
        };

        for name in self.row_fields.iter().chain(&self.column_fields) {
            lookup(name)?;
        }

        for spec in &self.values {
            let info = lookup(&spec.field)?;
            if !info.role.allowed_aggregations().contains(&spec.aggregation) {
                return Err(PivotError::UnsupportedAggregation {
                    field: spec.field.clone(),
                    aggregation: spec.aggregation,
                });
            }
        }

        Ok(())
    }
}
