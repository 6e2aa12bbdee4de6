//! FILENAME: tests/test_pivot_engine.rs
//! Integration tests for the pivot calculation pipeline.

mod common;

use common::{fields, request, small_sales, sum_of, SalesFixture};
use pivot_engine::{
    calculate_pivot, compute_stats, estimate_columns, AggregationSpec, AggregationType,
    EngineConfig, HeaderCell, PivotCell, RecordSet, RecordValue, RowKind,
};

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_region_by_product_sum() {
    let req = request(&["region"], &["product"], &[("sales", AggregationType::Sum)]);
    let result = calculate_pivot(&small_sales(), &req, &EngineConfig::default(), false);

    assert_eq!(result.leaf_cols, vec!["A|||sales(sum)", "B|||sales(sum)"]);
    let keys: Vec<&str> = result.rows.iter().map(|r| r.row_key.as_str()).collect();
    assert_eq!(keys, vec!["East", "West"]);

    assert_eq!(sum_of(result.cell(0, "A|||sales(sum)")), Some(10.0));
    assert_eq!(sum_of(result.cell(0, "B|||sales(sum)")), Some(20.0));
    assert_eq!(sum_of(result.cell(1, "A|||sales(sum)")), Some(5.0));
    assert_eq!(result.cell(1, "B|||sales(sum)"), None);

    let total = result.grand_total.as_ref().unwrap();
    assert_eq!(sum_of(total.cell(0)), Some(15.0));
    assert_eq!(sum_of(total.cell(1)), Some(20.0));
}

#[test]
fn test_overall_average() {
    let req = request(&[], &[], &[("sales", AggregationType::Average)]);
    let config = EngineConfig::default();
    let result = calculate_pivot(&small_sales(), &req, &config, false);

    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].row_key, "TOTAL");

    let stats = result.rows[0].cell(0).and_then(PivotCell::stats).unwrap();
    assert_eq!(stats.sum, Some(35.0));
    assert_eq!(stats.valid_count, 3);
    assert!((stats.avg().unwrap() - 35.0 / 3.0).abs() < 1e-12);
    assert_eq!(result.display_value(&result.rows[0], 0, &config), "11.67");
}

#[test]
fn test_two_level_subtotals() {
    let req = request(&["region", "product"], &[], &[("sales", AggregationType::Sum)]);
    let result = calculate_pivot(&small_sales(), &req, &EngineConfig::default(), false);

    let keys: Vec<&str> = result.rows.iter().map(|r| r.row_key.as_str()).collect();
    assert_eq!(keys, vec!["East|||A", "East|||B", "East", "West|||A"]);

    let subtotal = &result.rows[2];
    assert_eq!(
        subtotal.kind,
        RowKind::Subtotal {
            level: 0,
            label: "Total East".to_string()
        }
    );
    assert_eq!(sum_of(subtotal.cell(0)), Some(30.0));
    assert_eq!(result.subtotal_rows().count(), 1);
}

#[test]
fn test_high_cardinality_warns() {
    let mut records = RecordSet::new(fields(&["region", "product", "sales"]));
    for i in 0..15_000usize {
        let combo = i % 2000;
        records.push_row(vec![
            RecordValue::from(format!("r{:02}", combo / 50)),
            RecordValue::from(format!("p{:02}", combo % 50)),
            RecordValue::from(1),
        ]);
    }

    let estimate = estimate_columns(
        &records,
        &fields(&["region", "product"]),
        &[AggregationSpec::new("sales", AggregationType::Sum)],
        &EngineConfig::default(),
    );

    assert!(estimate.sampled_records <= 10_000);
    assert!(estimate.estimated_columns > 1000);
    assert!(estimate.should_warn);
}

#[test]
fn test_limited_report_matches_rendered_columns() {
    let mut records = RecordSet::new(fields(&["region", "code", "sales"]));
    for i in 0..3000usize {
        records.push_row(vec![
            RecordValue::from(if i % 2 == 0 { "East" } else { "West" }),
            RecordValue::from(format!("c{:04}", i % 1500)),
            RecordValue::from(i as f64),
        ]);
    }
    let req = request(
        &["region"],
        &["code"],
        &[("sales", AggregationType::Sum), ("sales", AggregationType::Sum)],
    );
    let config = EngineConfig::default();

    let estimate = estimate_columns(&records, &req.column_fields, &req.values, &config);
    assert_eq!(estimate.estimated_columns, 1500);

    let result = calculate_pivot(&records, &req, &config, true);
    let info = result.column_limit_info.unwrap();
    assert!(info.columns_limited);
    assert_eq!(info.original_columns, 1500);
    assert_eq!(info.displayed_columns, result.leaf_cols.len());
    assert_eq!(result.leaf_cols.len(), 1000);
}

#[test]
fn test_zero_sample_size_does_not_panic() {
    let config: EngineConfig = serde_json::from_str(r#"{ "sample_size": 0 }"#).unwrap();
    let records = SalesFixture::records();
    let req = request(&["region"], &["quarter"], &[("sales", AggregationType::Sum)]);

    let estimate = estimate_columns(&records, &req.column_fields, &req.values, &config);
    assert_eq!(estimate.sampled_records, 1);
    assert!(!estimate.should_warn);
    assert_eq!(calculate_pivot(&records, &req, &config, false).leaf_cols.len(), 2);
}

#[test]
fn test_text_field_summed_shows_dash() {
    let req = request(&["region"], &[], &[("category", AggregationType::Sum)]);
    let config = EngineConfig::default();
    let result = calculate_pivot(&SalesFixture::records(), &req, &config, false);

    for row in result.data_rows() {
        let stats = row.cell(0).and_then(PivotCell::stats).unwrap();
        assert_eq!(stats.valid_count, 0);
        assert_eq!(stats.raw_count, 4);
        assert_eq!(stats.sum, None);
        assert_eq!(result.display_value(row, 0, &config), "—");
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn quarterly_result() -> pivot_engine::PivotResult {
    let req = request(
        &["region", "product"],
        &["quarter"],
        &[
            ("sales", AggregationType::Sum),
            ("quantity", AggregationType::Sum),
        ],
    );
    calculate_pivot(&SalesFixture::records(), &req, &EngineConfig::default(), false)
}

#[test]
fn test_cell_stats_are_consistent() {
    let result = quarterly_result();
    for row in result.rows.iter().chain(result.grand_total.iter()) {
        for cell in row.cells.iter().flatten() {
            assert!(cell.stats().unwrap().is_consistent());
        }
    }
}

#[test]
fn test_leaf_columns_sorted_and_unique() {
    let result = quarterly_result();
    assert!(result.leaf_cols.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(
        result.leaf_cols,
        vec![
            "Q1|||quantity(sum)",
            "Q1|||sales(sum)",
            "Q2|||quantity(sum)",
            "Q2|||sales(sum)",
        ]
    );
}

#[test]
fn test_headers_merge_quarters() {
    let result = quarterly_result();
    assert_eq!(result.header_rows.len(), 2);
    assert_eq!(
        result.header_rows[0],
        vec![
            HeaderCell {
                label: "Q1".to_string(),
                col_span: 2
            },
            HeaderCell {
                label: "Q2".to_string(),
                col_span: 2
            },
        ]
    );
    assert_eq!(result.header_rows[1].len(), 4);
}

#[test]
fn test_row_spans_cover_data_rows() {
    let result = quarterly_result();
    let data_rows = result.data_rows().count();

    for level in 0..2 {
        let total: usize = result
            .rows
            .iter()
            .zip(&result.row_spans)
            .filter(|(row, _)| row.is_data())
            .map(|(_, spans)| spans[level].span)
            .sum();
        assert_eq!(total, data_rows);
    }

    // East|||Gadget, East|||Widget share a level-0 run of two
    assert_eq!(result.row_spans[0][0].span, 2);
    assert_eq!(result.row_spans[1][0].span, 0);
    assert_eq!(result.row_spans[2][0].span, 1);
    assert!(result.row_spans[2][0].is_subtotal);
}

#[test]
fn test_subtotal_matches_direct_stats() {
    let records = SalesFixture::records();
    let result = quarterly_result();
    let region = records.field_index("region");
    let sales = records.field_index("sales");
    let quarter = records.field_index("quarter");
    let col = result.column_index("Q1|||sales(sum)").unwrap();

    for subtotal in result.subtotal_rows() {
        let name = subtotal.label(0);
        let direct = compute_stats(
            (0..records.len())
                .filter(|&i| records.value(i, region).to_string() == name)
                .filter(|&i| records.value(i, quarter).to_string() == "Q1")
                .map(|i| records.value(i, sales)),
        );
        assert_eq!(subtotal.cell(col).and_then(PivotCell::stats), Some(&direct));
    }
}

#[test]
fn test_grand_total_matches_all_records() {
    let records = SalesFixture::records();
    let req = request(&["region", "product"], &[], &[("sales", AggregationType::Max)]);
    let result = calculate_pivot(&records, &req, &EngineConfig::default(), false);

    let sales = records.field_index("sales");
    let direct = compute_stats((0..records.len()).map(|i| records.value(i, sales)));
    let total = result.grand_total.as_ref().unwrap();

    assert_eq!(total.cell(0).and_then(PivotCell::stats), Some(&direct));
    assert_eq!(direct.sum, Some(127_500.0));
    assert_eq!(direct.max, Some(15_000.0));
}

#[test]
fn test_calculation_is_idempotent() {
    assert_eq!(quarterly_result(), quarterly_result());
}

#[test]
fn test_result_serializes_for_renderer() {
    let result = quarterly_result();
    let json = serde_json::to_value(&result).unwrap();

    assert!(json["leafCols"].is_array());
    assert!(json["headerRows"].is_array());
    assert!(json["rowSpans"].is_array());
    assert_eq!(json["colAggInfo"]["Q1|||sales(sum)"]["field"], "sales");
    assert_eq!(json["rowGroups"][0], "region");
}
