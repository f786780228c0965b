//! Result aggregation: the comprehensive price analyzer plus input
//! validation and the untyped-table loader. Sub-analyses are independently
//! guarded — a degraded statistics section never blocks best-deal or
//! bracket computation.

pub mod comparison;
pub mod trend;

use serde_json::{Map, Value};
use tracing::info;

use crate::config::{bracket_width, DEFAULT_SIMILARITY_THRESHOLD, IQR_FENCE};
use crate::error::{MonitorError, Result};
use crate::matcher::ProductMatcher;
use crate::stats::describe::{mean, percentile, sample_std};
use crate::stats::{StatisticalAnalyzer, StatsOptions};
use crate::types::{AnalysisResult, ProductRecord};
use crate::util::format_currency;

pub use comparison::ComparisonAnalyzer;
pub use trend::TrendAnalyzer;

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub similarity_threshold: f64,
    pub stats: StatsOptions,
    pub include_matching: bool,
    pub include_statistics: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            stats: StatsOptions::default(),
            include_matching: true,
            include_statistics: true,
        }
    }
}

/// Top-level analyzer combining overview, platform comparison, price
/// distribution, best deals, market insights, recommendations, and the
/// matching/statistical sub-analyses.
pub struct PriceAnalyzer {
    options: AnalyzeOptions,
}

impl Default for PriceAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzeOptions::default())
    }
}

impl PriceAnalyzer {
    pub fn new(options: AnalyzeOptions) -> Self {
        Self { options }
    }

    pub fn analyze(&self, records: &[ProductRecord]) -> Result<AnalysisResult> {
        validate_records(records)?;

        let mut data = Map::new();
        data.insert("overview".into(), overview(records));
        data.insert("platform_comparison".into(), platform_comparison(records));
        data.insert("price_distribution".into(), price_distribution(records));
        data.insert("best_deals".into(), best_deals(records));
        data.insert("market_insights".into(), market_insights(records));
        data.insert("recommendations".into(), recommendations(records));

        if has_temporal_data(records) {
            let trends = TrendAnalyzer::default().analyze(records)?;
            data.insert("trends".into(), Value::Object(trends.data));
        }

        if self.options.include_matching {
            let matcher = ProductMatcher::new(self.options.similarity_threshold);
            let matches = matcher.find_matches(records);
            info!(match_count = matches.len(), "cross-platform matching complete");
            let mut matched = Map::new();
            matched.insert("match_count".into(), Value::from(matches.len()));
            matched.insert(
                "matches".into(),
                serde_json::to_value(&matches)
                    .map_err(|e| MonitorError::Analyzer(format!("serializing matches: {e}")))?,
            );
            data.insert("matched_products".into(), Value::Object(matched));
        }

        if self.options.include_statistics {
            let report = StatisticalAnalyzer::new(self.options.stats.clone()).report(records);
            data.insert("statistics".into(), Value::Object(report.into_data()));
        }

        let mut metadata = Map::new();
        metadata.insert("total_products".into(), Value::from(records.len()));
        metadata.insert(
            "platforms".into(),
            Value::from(platforms_in_order(records)),
        );
        let mut price_range = Map::new();
        let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
        price_range.insert(
            "min".into(),
            Value::from(prices.iter().copied().fold(f64::INFINITY, f64::min)),
        );
        price_range.insert(
            "max".into(),
            Value::from(prices.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        );
        metadata.insert("price_range".into(), Value::Object(price_range));

        Ok(AnalysisResult::new(
            "comprehensive_price_analysis",
            data,
            metadata,
        ))
    }
}

// ---------------------------------------------------------------------------
// Validation and table loading
// ---------------------------------------------------------------------------

/// Analysis refuses to start on an empty batch.
pub fn validate_records(records: &[ProductRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(MonitorError::Validation(
            "empty record list provided for analysis".to_string(),
        ));
    }
    Ok(())
}

/// Build records from an untyped row table (JSON objects). Rows must carry
/// `platform`, `name`, and `price`; everything else is optional.
pub fn records_from_rows(rows: &[Value]) -> Result<Vec<ProductRecord>> {
    if rows.is_empty() {
        return Err(MonitorError::Validation(
            "empty table provided for analysis".to_string(),
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| {
            MonitorError::Validation(format!("row {idx} is not an object"))
        })?;

        let price = obj
            .get("price")
            .and_then(Value::as_f64)
            .ok_or_else(|| MonitorError::Validation("missing required column: price".to_string()))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| MonitorError::Validation("missing required column: name".to_string()))?;
        let platform = obj.get("platform").and_then(Value::as_str).ok_or_else(|| {
            MonitorError::Validation("missing required column: platform".to_string())
        })?;
        if price < 0.0 {
            return Err(MonitorError::Validation(format!(
                "row {idx}: price must be non-negative"
            )));
        }

        let get_str = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let mut record = ProductRecord::new(
            platform,
            get_str("product_id").unwrap_or_else(|| format!("row-{idx}")),
            name,
            price,
            get_str("currency").unwrap_or_else(|| "USD".to_string()),
            get_str("availability").unwrap_or_default(),
            get_str("url").unwrap_or_default(),
        );
        record.image_url = get_str("image_url");
        record.rating = obj.get("rating").and_then(Value::as_f64);
        record.review_count = obj.get("review_count").and_then(Value::as_u64);
        record.seller = get_str("seller");
        record.category = get_str("category");
        record.brand = get_str("brand");
        record.description = get_str("description");
        if let Some(ts) = get_str("timestamp") {
            if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(&ts) {
                record.timestamp = parsed.with_timezone(&chrono::Utc);
            }
        }
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Distinct platforms in first-appearance order — keeps every derived
/// listing deterministic for a fixed input.
pub fn platforms_in_order(records: &[ProductRecord]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for record in records {
        if !out.contains(&record.platform) {
            out.push(record.platform.clone());
        }
    }
    out
}

fn valid_prices(records: &[ProductRecord]) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.has_valid_price())
        .map(|r| r.price)
        .collect()
}

pub(crate) fn has_temporal_data(records: &[ProductRecord]) -> bool {
    let mut first = None;
    for record in records {
        match first {
            None => first = Some(record.timestamp),
            Some(t) if t != record.timestamp => return true,
            _ => {}
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn overview(records: &[ProductRecord]) -> Value {
    let mut out = Map::new();
    out.insert("total_products".into(), Value::from(records.len()));
    out.insert(
        "platforms_count".into(),
        Value::from(platforms_in_order(records).len()),
    );

    let prices = valid_prices(records);
    let mut price_stats = Map::new();
    if !prices.is_empty() {
        let mut sorted = prices.clone();
        sorted.sort_by(f64::total_cmp);
        price_stats.insert("average".into(), Value::from(mean(&prices)));
        price_stats.insert("median".into(), Value::from(percentile(&sorted, 0.5)));
        price_stats.insert("min".into(), Value::from(sorted[0]));
        price_stats.insert("max".into(), Value::from(sorted[sorted.len() - 1]));
        price_stats.insert("std".into(), Value::from(sample_std(&prices)));
    }
    out.insert("price_stats".into(), Value::Object(price_stats));

    let mut availability: Map<String, Value> = Map::new();
    for record in records {
        if record.availability.is_empty() {
            continue;
        }
        let counter = availability
            .entry(record.availability.clone())
            .or_insert(Value::from(0u64));
        *counter = Value::from(counter.as_u64().unwrap_or(0) + 1);
    }
    out.insert("availability".into(), Value::Object(availability));

    let ratings: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();
    if !ratings.is_empty() {
        let mut rating_stats = Map::new();
        rating_stats.insert("average".into(), Value::from(mean(&ratings)));
        rating_stats.insert("products_with_rating".into(), Value::from(ratings.len()));
        let mut distribution: Map<String, Value> = Map::new();
        for r in &ratings {
            let key = format!("{r:.1}");
            let counter = distribution.entry(key).or_insert(Value::from(0u64));
            *counter = Value::from(counter.as_u64().unwrap_or(0) + 1);
        }
        rating_stats.insert("rating_distribution".into(), Value::Object(distribution));
        out.insert("rating_stats".into(), Value::Object(rating_stats));
    }

    Value::Object(out)
}

fn platform_comparison(records: &[ProductRecord]) -> Value {
    let mut out = Map::new();
    let mut averages: Vec<(String, f64)> = Vec::new();

    for platform in platforms_in_order(records) {
        let platform_records: Vec<&ProductRecord> =
            records.iter().filter(|r| r.platform == platform).collect();
        let prices: Vec<f64> = platform_records
            .iter()
            .filter(|r| r.has_valid_price())
            .map(|r| r.price)
            .collect();
        if prices.is_empty() {
            continue;
        }
        let mut sorted = prices.clone();
        sorted.sort_by(f64::total_cmp);

        let mut stats = Map::new();
        stats.insert("product_count".into(), Value::from(platform_records.len()));
        stats.insert("average_price".into(), Value::from(mean(&prices)));
        stats.insert("median_price".into(), Value::from(percentile(&sorted, 0.5)));
        stats.insert("min_price".into(), Value::from(sorted[0]));
        stats.insert("max_price".into(), Value::from(sorted[sorted.len() - 1]));
        stats.insert("price_std".into(), Value::from(sample_std(&prices)));

        let ratings: Vec<f64> = platform_records.iter().filter_map(|r| r.rating).collect();
        if !ratings.is_empty() {
            stats.insert("average_rating".into(), Value::from(mean(&ratings)));
            stats.insert("rating_count".into(), Value::from(ratings.len()));
        }

        averages.push((platform.clone(), mean(&prices)));
        out.insert(platform, Value::Object(stats));
    }

    if !averages.is_empty() {
        let cheapest = averages
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p.clone())
            .unwrap_or_default();
        let most_expensive = averages
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p.clone())
            .unwrap_or_default();
        let min_avg = averages.iter().map(|(_, a)| *a).fold(f64::INFINITY, f64::min);
        let max_avg = averages.iter().map(|(_, a)| *a).fold(f64::NEG_INFINITY, f64::max);

        let mut summary = Map::new();
        summary.insert("cheapest_platform".into(), Value::from(cheapest));
        summary.insert("most_expensive_platform".into(), Value::from(most_expensive));
        summary.insert("price_difference".into(), Value::from(max_avg - min_avg));
        out.insert("summary".into(), Value::Object(summary));
    }

    Value::Object(out)
}

fn price_distribution(records: &[ProductRecord]) -> Value {
    let prices = valid_prices(records);
    if prices.is_empty() {
        return Value::Object(Map::new());
    }
    let mut sorted = prices.clone();
    sorted.sort_by(f64::total_cmp);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let width = bracket_width(max - min);

    let mut brackets = Map::new();
    let mut start = min;
    let mut index = 1;
    while start < max {
        let end = (start + width).min(max);
        let is_last = end >= max;
        let count = sorted
            .iter()
            .filter(|&&p| p >= start && (p < end || (is_last && p <= end)))
            .count();
        let mut bracket = Map::new();
        bracket.insert("count".into(), Value::from(count));
        bracket.insert(
            "percentage".into(),
            Value::from(count as f64 / sorted.len() as f64 * 100.0),
        );
        bracket.insert(
            "price_range".into(),
            Value::from(format!(
                "{} - {}",
                format_currency(start, "USD"),
                format_currency(end, "USD")
            )),
        );
        brackets.insert(format!("Bracket_{index}"), Value::Object(bracket));
        start = end;
        index += 1;
    }

    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;
    let outlier_values: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|&p| p < lower || p > upper)
        .collect();

    let mut outliers = Map::new();
    outliers.insert("count".into(), Value::from(outlier_values.len()));
    outliers.insert(
        "percentage".into(),
        Value::from(outlier_values.len() as f64 / sorted.len() as f64 * 100.0),
    );
    outliers.insert("values".into(), Value::from(outlier_values));

    let mut quartiles = Map::new();
    quartiles.insert("q1".into(), Value::from(q1));
    quartiles.insert("q2".into(), Value::from(percentile(&sorted, 0.5)));
    quartiles.insert("q3".into(), Value::from(q3));
    quartiles.insert("iqr".into(), Value::from(iqr));

    let mut out = Map::new();
    out.insert("distribution".into(), Value::Object(brackets));
    out.insert("outliers".into(), Value::Object(outliers));
    out.insert("quartiles".into(), Value::Object(quartiles));
    Value::Object(out)
}

fn deal_entry(record: &ProductRecord, extra: &[(&str, Value)]) -> Value {
    let mut entry = Map::new();
    entry.insert("name".into(), Value::from(record.name.clone()));
    entry.insert("platform".into(), Value::from(record.platform.clone()));
    entry.insert("price".into(), Value::from(record.price));
    entry.insert(
        "formatted_price".into(),
        Value::from(format_currency(record.price, &record.currency)),
    );
    entry.insert("url".into(), Value::from(record.url.clone()));
    entry.insert(
        "rating".into(),
        record.rating.map(Value::from).unwrap_or(Value::Null),
    );
    for (key, value) in extra {
        entry.insert((*key).to_string(), value.clone());
    }
    Value::Object(entry)
}

fn best_deals(records: &[ProductRecord]) -> Value {
    let mut out = Map::new();

    let mut priced: Vec<&ProductRecord> =
        records.iter().filter(|r| r.has_valid_price()).collect();
    if !priced.is_empty() {
        priced.sort_by(|a, b| a.price.total_cmp(&b.price));
        let cheapest: Vec<Value> = priced.iter().take(5).map(|r| deal_entry(r, &[])).collect();
        out.insert("cheapest".into(), Value::from(cheapest));
    }

    let mut rated: Vec<&ProductRecord> = records.iter().filter(|r| r.rating.is_some()).collect();
    if !rated.is_empty() {
        rated.sort_by(|a, b| {
            b.rating
                .unwrap_or_default()
                .total_cmp(&a.rating.unwrap_or_default())
        });
        let highest: Vec<Value> = rated.iter().take(5).map(|r| deal_entry(r, &[])).collect();
        out.insert("highest_rated".into(), Value::from(highest));
    }

    let valued: Vec<&ProductRecord> = records
        .iter()
        .filter(|r| r.has_valid_price() && r.rating.is_some())
        .collect();
    if !valued.is_empty() {
        let max_price = valued
            .iter()
            .map(|r| r.price)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut scored: Vec<(&ProductRecord, f64)> = valued
            .iter()
            .map(|r| {
                let score =
                    (r.rating.unwrap_or_default() / 5.0) * (1.0 - r.price / max_price);
                (*r, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let best: Vec<Value> = scored
            .iter()
            .take(5)
            .map(|(r, score)| deal_entry(r, &[("value_score", Value::from(*score))]))
            .collect();
        out.insert("best_value".into(), Value::from(best));
    }

    Value::Object(out)
}

fn market_insights(records: &[ProductRecord]) -> Value {
    let mut out = Map::new();

    let platforms = platforms_in_order(records);
    if !platforms.is_empty() {
        let counts: Vec<(String, usize)> = platforms
            .iter()
            .map(|p| (p.clone(), records.iter().filter(|r| &r.platform == p).count()))
            .collect();
        let (dominant, dominant_count) = counts
            .iter()
            .max_by_key(|(_, c)| *c)
            .map(|(p, c)| (p.clone(), *c))
            .unwrap_or_default();

        let mut concentration = Map::new();
        concentration.insert("dominant_platform".into(), Value::from(dominant));
        concentration.insert(
            "dominant_platform_share".into(),
            Value::from(dominant_count as f64 / records.len() as f64 * 100.0),
        );
        concentration.insert("market_fragmentation".into(), Value::from(platforms.len()));
        out.insert("market_concentration".into(), Value::Object(concentration));
    }

    let prices = valid_prices(records);
    if !prices.is_empty() {
        let m = mean(&prices);
        let cv = if m != 0.0 { sample_std(&prices) / m } else { 0.0 };
        let level = if cv > 0.3 {
            "High"
        } else if cv > 0.15 {
            "Medium"
        } else {
            "Low"
        };
        let spread = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - prices.iter().copied().fold(f64::INFINITY, f64::min);

        let mut competitiveness = Map::new();
        competitiveness.insert("level".into(), Value::from(level));
        competitiveness.insert("coefficient_of_variation".into(), Value::from(cv));
        competitiveness.insert("price_spread".into(), Value::from(spread));
        out.insert("price_competitiveness".into(), Value::Object(competitiveness));
    }

    let ratings: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();
    if !ratings.is_empty() {
        let avg = mean(&ratings);
        let quality = if avg >= 4.0 {
            "High"
        } else if avg >= 3.0 {
            "Medium"
        } else {
            "Low"
        };
        let mut patterns = Map::new();
        patterns.insert("average_quality".into(), Value::from(quality));
        patterns.insert("average_rating".into(), Value::from(avg));
        patterns.insert(
            "rating_consistency".into(),
            Value::from(1.0 / (sample_std(&ratings) + 0.1)),
        );
        out.insert("quality_patterns".into(), Value::Object(patterns));
    }

    Value::Object(out)
}

fn recommendations(records: &[ProductRecord]) -> Value {
    let mut recs: Vec<Value> = Vec::new();

    let groups = crate::stats::platform_price_groups(records);
    if !groups.is_empty() {
        let means: Vec<(String, f64)> = groups
            .iter()
            .map(|(p, prices)| (p.clone(), mean(prices)))
            .collect();
        let cheapest = means
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .cloned()
            .unwrap_or_default();
        let max_mean = means.iter().map(|(_, m)| *m).fold(f64::NEG_INFINITY, f64::max);
        let savings = max_mean - cheapest.1;

        let mut rec = Map::new();
        rec.insert("type".into(), Value::from("price_optimization"));
        rec.insert(
            "title".into(),
            Value::from(format!("Shop on {} for best prices", cheapest.0)),
        );
        rec.insert(
            "description".into(),
            Value::from(format!(
                "On average, you can save ${savings:.2} by choosing {}",
                cheapest.0
            )),
        );
        rec.insert("confidence".into(), Value::from("high"));
        recs.push(Value::Object(rec));
    }

    let mut platform_ratings: Vec<(String, f64)> = Vec::new();
    for platform in platforms_in_order(records) {
        let ratings: Vec<f64> = records
            .iter()
            .filter(|r| r.platform == platform)
            .filter_map(|r| r.rating)
            .collect();
        if !ratings.is_empty() {
            platform_ratings.push((platform, mean(&ratings)));
        }
    }
    if let Some((best_platform, best_rating)) = platform_ratings
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .cloned()
    {
        let mut rec = Map::new();
        rec.insert("type".into(), Value::from("quality_optimization"));
        rec.insert(
            "title".into(),
            Value::from(format!(
                "Consider {best_platform} for highest quality products"
            )),
        );
        rec.insert(
            "description".into(),
            Value::from(format!(
                "{best_platform} has the highest average rating of {best_rating:.1}"
            )),
        );
        rec.insert("confidence".into(), Value::from("medium"));
        recs.push(Value::Object(rec));
    }

    let mut rec = Map::new();
    rec.insert("type".into(), Value::from("market_timing"));
    rec.insert("title".into(), Value::from("Monitor prices for better deals"));
    rec.insert(
        "description".into(),
        Value::from("Price monitoring can help you identify the best time to buy"),
    );
    rec.insert("confidence".into(), Value::from("medium"));
    recs.push(Value::Object(rec));

    Value::from(recs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(platform: &str, id: &str, name: &str, price: f64) -> ProductRecord {
        ProductRecord::new(platform, id, name, price, "USD", "In Stock", "https://x/p")
    }

    #[test]
    fn empty_input_is_a_validation_error() {
        let out = PriceAnalyzer::default().analyze(&[]);
        assert!(matches!(out, Err(MonitorError::Validation(_))));
    }

    #[test]
    fn rows_without_price_are_rejected() {
        let rows = vec![json!({"platform": "amazon", "name": "Widget"})];
        let out = records_from_rows(&rows);
        match out {
            Err(MonitorError::Validation(msg)) => assert!(msg.contains("price")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rows_round_trip_into_records() {
        let rows = vec![json!({
            "platform": "amazon",
            "product_id": "B01",
            "name": "Widget",
            "price": 19.99,
            "rating": 4.5,
        })];
        let records = records_from_rows(&rows).unwrap();
        assert_eq!(records[0].product_id, "B01");
        assert_eq!(records[0].rating, Some(4.5));
    }

    #[test]
    fn analysis_carries_all_fixed_keys() {
        let records = vec![
            record("amazon", "1", "Widget A", 10.0),
            record("ebay", "2", "Widget B", 12.0),
            record("jd", "3", "Widget C", 14.0),
        ];
        let result = PriceAnalyzer::default().analyze(&records).unwrap();
        for key in [
            "overview",
            "platform_comparison",
            "price_distribution",
            "best_deals",
            "market_insights",
            "recommendations",
            "matched_products",
            "statistics",
        ] {
            assert!(result.data.contains_key(key), "missing key {key}");
        }
        assert_eq!(result.metadata["total_products"], Value::from(3));
        assert_eq!(
            result.metadata["platforms"],
            Value::from(vec!["amazon", "ebay", "jd"])
        );
    }

    #[test]
    fn platform_summary_names_cheapest_and_priciest() {
        let records = vec![
            record("amazon", "1", "Widget", 30.0),
            record("ebay", "2", "Widget", 10.0),
            record("ebay", "3", "Widget", 12.0),
        ];
        let result = PriceAnalyzer::default().analyze(&records).unwrap();
        let summary = &result.data["platform_comparison"]["summary"];
        assert_eq!(summary["cheapest_platform"], Value::from("ebay"));
        assert_eq!(summary["most_expensive_platform"], Value::from("amazon"));
        assert_eq!(summary["price_difference"], Value::from(19.0));
    }

    #[test]
    fn bracket_counts_cover_every_valid_price() {
        let records = vec![
            record("a", "1", "W", 10.0),
            record("a", "2", "W", 20.0),
            record("a", "3", "W", 30.0),
            record("a", "4", "W", 55.0),
        ];
        let result = PriceAnalyzer::default().analyze(&records).unwrap();
        let brackets = result.data["price_distribution"]["distribution"]
            .as_object()
            .unwrap();
        let total: u64 = brackets
            .values()
            .map(|b| b["count"].as_u64().unwrap())
            .sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn best_value_prefers_cheap_and_highly_rated() {
        let mut cheap_good = record("a", "1", "Cheap good", 10.0);
        cheap_good.rating = Some(4.8);
        let mut pricey_bad = record("b", "2", "Pricey bad", 100.0);
        pricey_bad.rating = Some(2.0);
        let result = PriceAnalyzer::default()
            .analyze(&[pricey_bad, cheap_good])
            .unwrap();
        let best = result.data["best_deals"]["best_value"].as_array().unwrap();
        assert_eq!(best[0]["name"], Value::from("Cheap good"));
    }

    #[test]
    fn insights_tier_price_competitiveness() {
        // tight prices → low competition signal
        let records = vec![
            record("a", "1", "W", 100.0),
            record("b", "2", "W", 101.0),
            record("c", "3", "W", 102.0),
        ];
        let result = PriceAnalyzer::default().analyze(&records).unwrap();
        let level = &result.data["market_insights"]["price_competitiveness"]["level"];
        assert_eq!(level, &Value::from("Low"));
    }
}
