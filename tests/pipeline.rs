//! End-to-end scenario tests over the public analysis pipeline.

use serde_json::{json, Value};

use price_monitor::analyzer::{records_from_rows, PriceAnalyzer};
use price_monitor::error::MonitorError;
use price_monitor::matcher::ProductMatcher;
use price_monitor::stats::{StatisticalAnalyzer, StatsOptions};
use price_monitor::text::similarity;
use price_monitor::types::ProductRecord;

fn record(platform: &str, id: &str, name: &str, price: f64) -> ProductRecord {
    ProductRecord::new(
        platform,
        id,
        name,
        price,
        "USD",
        "In Stock",
        format!("https://{platform}.example/{id}"),
    )
}

/// Four records, two of which are the same phone listed on different
/// platforms under differently formatted names.
fn iphone_batch() -> Vec<ProductRecord> {
    vec![
        record("A", "1", "Apple iPhone 15 Pro 256GB", 999.0),
        record("B", "2", "iPhone15 Pro 256G", 949.0),
        record("C", "3", "Samsung Galaxy S24", 899.0),
        record("A", "4", "Apple iPhone 15 Pro 256GB", 999.0),
    ]
}

#[test]
fn cross_platform_iphone_match() {
    let groups = ProductMatcher::default().find_matches(&iphone_batch());

    assert_eq!(groups.len(), 1, "expected exactly one match group");
    let group = &groups[0];

    let ids: Vec<&str> = group.members.iter().map(|m| m.product_id.as_str()).collect();
    assert!(ids.contains(&"1") && ids.contains(&"2"));
    assert!(!ids.contains(&"3"), "the Samsung listing must not match");
    assert!(group.platform_count >= 2);

    let spread = group.price_spread.as_ref().unwrap();
    assert_eq!(spread.min_price, 949.0);
    assert_eq!(spread.max_price, 999.0);
    assert_eq!(spread.price_difference, 50.0);
    assert!((spread.price_difference_percent - 5.268).abs() < 0.01);
    assert_eq!(spread.cheapest_platform, "B");
    assert_eq!(spread.most_expensive_platform, "A");
}

#[test]
fn iphone_names_clear_the_default_threshold() {
    let s = similarity("Apple iPhone 15 Pro 256GB", "iPhone15 Pro 256G");
    assert!(s >= 0.8, "expected >= 0.8, got {s}");
    let other = similarity("Apple iPhone 15 Pro 256GB", "Samsung Galaxy S24");
    assert!(other < 0.8, "expected < 0.8, got {other}");
}

#[test]
fn full_analysis_over_the_batch() {
    let result = PriceAnalyzer::default().analyze(&iphone_batch()).unwrap();

    assert_eq!(result.analysis_type, "comprehensive_price_analysis");
    assert_eq!(
        result.data["matched_products"]["match_count"],
        Value::from(1)
    );
    assert_eq!(result.metadata["total_products"], Value::from(4));
    assert_eq!(
        result.metadata["platforms"],
        Value::from(vec!["A", "B", "C"])
    );

    // the flattened result must round-trip through JSON
    let serialized = serde_json::to_string(&result.to_value()).unwrap();
    let parsed: Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(parsed["analysis_type"], "comprehensive_price_analysis");
    assert!(parsed["timestamp"].as_str().unwrap().contains('T'));
}

#[test]
fn empty_batch_is_rejected() {
    let out = PriceAnalyzer::default().analyze(&[]);
    assert!(matches!(out, Err(MonitorError::Validation(_))));
}

#[test]
fn table_without_price_column_is_rejected() {
    let rows = vec![
        json!({"platform": "A", "name": "Widget"}),
        json!({"platform": "B", "name": "Widget"}),
    ];
    let out = records_from_rows(&rows);
    match out {
        Err(MonitorError::Validation(msg)) => assert!(msg.contains("price"), "{msg}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn statistics_on_known_vector() {
    let records: Vec<ProductRecord> = [100.0, 110.0, 120.0, 130.0, 140.0]
        .iter()
        .enumerate()
        .map(|(i, &p)| record(if i % 2 == 0 { "A" } else { "B" }, &format!("{i}"), "Widget", p))
        .collect();

    let report = StatisticalAnalyzer::default().report(&records);
    let summary = report.descriptive.unwrap();
    assert_eq!(summary.count, 5);
    assert_eq!(summary.mean, 120.0);
    assert_eq!(summary.median, 120.0);
    assert_eq!(summary.range, 40.0);
}

#[test]
fn constant_prices_collapse_confidence_intervals() {
    let records: Vec<ProductRecord> = (0..4)
        .map(|i| record("A", &i.to_string(), "Widget", 100.0))
        .collect();

    let report = StatisticalAnalyzer::new(StatsOptions::default()).report(&records);
    let ci = report.confidence_intervals.unwrap();
    assert_eq!(ci.mean_ci.lower, 100.0);
    assert_eq!(ci.mean_ci.upper, 100.0);
    assert_eq!(ci.median_ci.lower, 100.0);
    assert_eq!(ci.median_ci.upper, 100.0);
}

#[test]
fn single_platform_batch_produces_no_groups() {
    let records: Vec<ProductRecord> = (0..3)
        .map(|i| record("A", &i.to_string(), "Acme Widget Deluxe", 10.0 + i as f64))
        .collect();
    let groups = ProductMatcher::default().find_matches(&records);
    assert!(groups.is_empty());
}

#[test]
fn chinese_and_latin_listings_of_same_item_can_be_analyzed_together() {
    let records = vec![
        record("jd", "1", "小米蓝牙耳机 正品包邮", 129.0),
        record("taobao", "2", "小米蓝牙耳机 特价", 119.0),
        record("amazon", "3", "Xiaomi Bluetooth Earbuds", 24.0),
    ];

    // the two Chinese listings normalize to the same tokens once the
    // marketing noise is stripped
    let s = similarity("小米蓝牙耳机 正品包邮", "小米蓝牙耳机 特价");
    assert!((s - 1.0).abs() < 1e-9, "marketing terms should not matter, got {s}");

    let groups = ProductMatcher::default().find_matches(&records);
    assert_eq!(groups.len(), 1);
    let spread = groups[0].price_spread.as_ref().unwrap();
    assert_eq!(spread.cheapest_platform, "taobao");
}
