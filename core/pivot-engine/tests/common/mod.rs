//! FILENAME: tests/common/mod.rs
//! Fixtures and helpers for pivot-engine integration tests.

#![allow(dead_code)]

use pivot_engine::{AggregationSpec, AggregationType, PivotCell, PivotRequest, RecordSet, RecordValue};

// ============================================================================
// FIXTURES
// ============================================================================

/// The three-record sales table used throughout the scenarios.
pub fn small_sales() -> RecordSet {
    RecordSet::from_records(vec![
        vec![
            ("region", RecordValue::from("East")),
            ("product", RecordValue::from("A")),
            ("sales", RecordValue::from(10)),
        ],
        vec![
            ("region", RecordValue::from("East")),
            ("product", RecordValue::from("B")),
            ("sales", RecordValue::from(20)),
        ],
        vec![
            ("region", RecordValue::from("West")),
            ("product", RecordValue::from("A")),
            ("sales", RecordValue::from(5)),
        ],
    ])
}

/// A quarterly sales table with three levels of grouping.
pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["region", "product", "quarter", "sales", "quantity", "category"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }

    pub fn records() -> RecordSet {
        let fields = Self::headers().into_iter().map(String::from).collect();
        let mut set = RecordSet::new(fields);
        for (region, product, quarter, sales, quantity) in Self::data() {
            set.push_row(vec![
                region.into(),
                product.into(),
                quarter.into(),
                sales.into(),
                quantity.into(),
                "retail".into(),
            ]);
        }
        set
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn request(rows: &[&str], cols: &[&str], values: &[(&str, AggregationType)]) -> PivotRequest {
    PivotRequest::new(
        fields(rows),
        fields(cols),
        values
            .iter()
            .map(|(field, agg)| AggregationSpec::new(*field, *agg))
            .collect(),
    )
}

/// The sum stored in a stats cell, if any.
pub fn sum_of(cell: Option<&PivotCell>) -> Option<f64> {
    cell.and_then(PivotCell::stats).and_then(|s| s.sum)
}
