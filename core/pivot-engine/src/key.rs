//! FILENAME: core/pivot-engine/src/key.rs
//! Composite keys for row and column grouping.
//!
//! A key is the string form of a record's values for an ordered list of
//! fields, joined with `KEY_SEPARATOR`. Row keys and column keys are built the
//! same way; they differ only in what an empty field list produces.

use std::borrow::Cow;

use smallvec::SmallVec;

use crate::definition::{value_in, AggregationSpec, RecordSet, RecordValue};

/// Joins the parts of a composite key.
pub const KEY_SEPARATOR: &str = "|||";

/// Label for null or missing values.
pub const MISSING_LABEL: &str = "N/A";

/// Row key used when no row fields are configured.
pub const TOTAL_ROW_KEY: &str = "TOTAL";

/// Builds composite keys for one ordered field list.
///
/// Field names are resolved against the record set once; an unknown field
/// reads as `Null` and therefore labels as `N/A`.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    columns: SmallVec<[Option<usize>; 4]>,
    empty_key: &'static str,
}

impl KeyBuilder {
    /// Key builder for row grouping. No fields yields `TOTAL`.
    pub fn rows(records: &RecordSet, fields: &[String]) -> Self {
        Self::new(records, fields, TOTAL_ROW_KEY)
    }

    /// Key builder for column grouping. No fields yields the empty string.
    pub fn columns(records: &RecordSet, fields: &[String]) -> Self {
        Self::new(records, fields, "")
    }

    fn new(records: &RecordSet, fields: &[String], empty_key: &'static str) -> Self {
        KeyBuilder {
            columns: fields.iter().map(|f| records.field_index(f)).collect(),
            empty_key,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Builds the key for one record.
    pub fn key(&self, record: &[RecordValue]) -> String {
        match self.columns.as_slice() {
            [] => self.empty_key.to_string(),
            [single] => value_label(value_in(record, *single)).into_owned(),
            many => {
                let parts: SmallVec<[Cow<'_, str>; 4]> = many
                    .iter()
                    .map(|c| value_label(value_in(record, *c)))
                    .collect();
                parts.join(KEY_SEPARATOR)
            }
        }
    }

    /// The individual labels making up the key, one per field.
    pub fn labels(&self, record: &[RecordValue]) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| value_label(value_in(record, *c)).into_owned())
            .collect()
    }
}

/// String form of a value as it appears inside keys and row labels.
pub fn value_label(value: &RecordValue) -> Cow<'_, str> {
    match value {
        RecordValue::Text(s) => Cow::Borrowed(s.as_str()),
        RecordValue::Null => Cow::Borrowed(MISSING_LABEL),
        other => Cow::Owned(other.to_string()),
    }
}

/// Joins key parts with the separator.
pub fn join_key<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Splits a key back into its parts.
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(KEY_SEPARATOR).collect()
}

/// Full leaf column key for a column-group base and an optional value spec.
///
/// - value spec and column fields: `base|||field(agg)`
/// - value spec only: `field(agg)`
/// - presence-only: `base`
pub fn column_key(base: Option<&str>, spec: Option<&AggregationSpec>) -> String {
    match (base, spec) {
        (Some(base), Some(spec)) => format!("{}{}{}", base, KEY_SEPARATOR, spec.column_tag()),
        (None, Some(spec)) => spec.column_tag(),
        (Some(base), None) => base.to_string(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::AggregationType;

    fn records() -> RecordSet {
        RecordSet::from_records(vec![vec![
            ("region", RecordValue::from("East")),
            ("product", RecordValue::Null),
            ("sales", RecordValue::from(10)),
        ]])
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_field_lists() {
        let set = records();
        assert_eq!(KeyBuilder::rows(&set, &[]).key(set.row(0)), "TOTAL");
        assert_eq!(KeyBuilder::columns(&set, &[]).key(set.row(0)), "");
    }

    #[test]
    fn test_single_and_multi_field_keys() {
        let set = records();
        let single = KeyBuilder::rows(&set, &fields(&["sales"]));
        assert_eq!(single.key(set.row(0)), "10");

        let multi = KeyBuilder::rows(&set, &fields(&["region", "product", "sales"]));
        assert_eq!(multi.key(set.row(0)), "East|||N/A|||10");
        assert_eq!(multi.labels(set.row(0)), vec!["East", "N/A", "10"]);
    }

    #[test]
    fn test_unknown_field_labels_as_missing() {
        let set = records();
        let keys = KeyBuilder::columns(&set, &fields(&["city", "region"]));
        assert_eq!(keys.key(set.row(0)), "N/A|||East");
    }

    #[test]
    fn test_column_key_shapes() {
        let spec = AggregationSpec::new("sales", AggregationType::Sum);
        assert_eq!(column_key(Some("A"), Some(&spec)), "A|||sales(sum)");
        assert_eq!(column_key(None, Some(&spec)), "sales(sum)");
        assert_eq!(column_key(Some("A|||B"), None), "A|||B");
        assert_eq!(split_key("A|||B|||sales(sum)"), vec!["A", "B", "sales(sum)"]);
        assert_eq!(join_key(&["East", "A"]), "East|||A");
    }
}
