//! FILENAME: core/pivot-engine/src/schema.rs
//! Field roles inferred from a sample of the records.
//!
//! The role decides which aggregations the field-assignment side offers:
//! numeric fields take every aggregation, date-like and text fields can only
//! be counted.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::definition::{AggregationType, RecordSet, RecordValue};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 1] = ["%Y-%m-%dT%H:%M:%S"];

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Numeric,
    Date,
    Text,
}

impl FieldRole {
    pub fn allowed_aggregations(self) -> &'static [AggregationType] {
        match self {
            FieldRole::Numeric => &AggregationType::ALL,
            FieldRole::Date | FieldRole::Text => &[AggregationType::Count],
        }
    }

    pub fn is_numeric(self) -> bool {
        self == FieldRole::Numeric
    }
}

/// A field name with its inferred role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub role: FieldRole,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, role: FieldRole) -> Self {
        FieldInfo {
            name: name.into(),
            role,
        }
    }
}

/// True when `text` parses as a date or timestamp with a plausible year.
pub fn is_date_like(text: &str) -> bool {
    let text = text.trim();
    let year = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .map(|date| date.year());

    matches!(year, Some(y) if (MIN_YEAR..=MAX_YEAR).contains(&y))
}

fn is_numeric_value(value: &RecordValue) -> bool {
    match value {
        RecordValue::Number(_) | RecordValue::Text(_) => value.as_number().is_some(),
        RecordValue::Null | RecordValue::Bool(_) => false,
    }
}

/// Infers the role of one field from its first non-null values.
pub fn infer_field_role(records: &RecordSet, field: &str, config: &EngineConfig) -> FieldRole {
    let Some(column) = records.field_index(field) else {
        return FieldRole::Text;
    };

    let sample: Vec<&RecordValue> = (0..records.len())
        .map(|i| records.value(i, Some(column)))
        .filter(|v| !v.is_null())
        .take(config.role_sample_size)
        .collect();

    if sample.is_empty() {
        return FieldRole::Text;
    }

    let needed = config.role_ratio * sample.len() as f64;

    let numeric = sample.iter().filter(|v| is_numeric_value(v)).count();
    if numeric as f64 >= needed {
        return FieldRole::Numeric;
    }

    let dates = sample
        .iter()
        .filter(|v| matches!(v, RecordValue::Text(s) if is_date_like(s)))
        .count();
    if dates as f64 >= needed {
        return FieldRole::Date;
    }

    FieldRole::Text
}

/// Infers the role of every field, in field order.
pub fn infer_schema(records: &RecordSet, config: &EngineConfig) -> Vec<FieldInfo> {
    records
        .fields()
        .iter()
        .map(|name| FieldInfo::new(name.as_str(), infer_field_role(records, name, config)))
        .collect()
}
