//! Cross-platform comparison analysis: platform overviews, price
//! competitiveness, feature comparison, product matching, market
//! positioning, value scoring, and per-platform strengths/weaknesses.

use serde_json::{Map, Value};

use crate::analyzer::{platforms_in_order, validate_records};
use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::error::{MonitorError, Result};
use crate::matcher::ProductMatcher;
use crate::stats::describe::{mean, percentile, sample_std};
use crate::types::{AnalysisResult, ProductRecord};
use crate::util::percentage_change;

pub struct ComparisonAnalyzer {
    similarity_threshold: f64,
}

impl Default for ComparisonAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl ComparisonAnalyzer {
    pub fn new(similarity_threshold: f64) -> Self {
        Self { similarity_threshold }
    }

    pub fn analyze(&self, records: &[ProductRecord]) -> Result<AnalysisResult> {
        validate_records(records)?;

        let mut data = Map::new();
        data.insert("platform_overview".into(), platform_overview(records));
        data.insert("price_comparison".into(), price_comparison(records));
        data.insert("feature_comparison".into(), feature_comparison(records));

        let matches = ProductMatcher::new(self.similarity_threshold).find_matches(records);
        let mut matched = Map::new();
        matched.insert("match_count".into(), Value::from(matches.len()));
        matched.insert(
            "matches".into(),
            serde_json::to_value(&matches)
                .map_err(|e| MonitorError::Analyzer(format!("serializing matches: {e}")))?,
        );
        data.insert("matched_products".into(), Value::Object(matched));

        data.insert("market_positioning".into(), market_positioning(records));
        data.insert("value_analysis".into(), value_analysis(records));
        data.insert("platform_analysis".into(), platform_strengths(records));

        let mut metadata = Map::new();
        metadata.insert(
            "platforms_compared".into(),
            Value::from(platforms_in_order(records).len()),
        );
        metadata.insert("total_products".into(), Value::from(records.len()));
        metadata.insert(
            "similarity_threshold".into(),
            Value::from(self.similarity_threshold),
        );

        Ok(AnalysisResult::new("comparison_analysis", data, metadata))
    }
}

struct PlatformSlice<'a> {
    name: String,
    records: Vec<&'a ProductRecord>,
    valid_prices: Vec<f64>,
    ratings: Vec<f64>,
}

fn slices(records: &[ProductRecord]) -> Vec<PlatformSlice<'_>> {
    platforms_in_order(records)
        .into_iter()
        .map(|name| {
            let platform_records: Vec<&ProductRecord> =
                records.iter().filter(|r| r.platform == name).collect();
            let valid_prices = platform_records
                .iter()
                .filter(|r| r.has_valid_price())
                .map(|r| r.price)
                .collect();
            let ratings = platform_records.iter().filter_map(|r| r.rating).collect();
            PlatformSlice {
                name,
                records: platform_records,
                valid_prices,
                ratings,
            }
        })
        .collect()
}

fn platform_overview(records: &[ProductRecord]) -> Value {
    let slices = slices(records);
    let mut out = Map::new();

    for slice in &slices {
        let avg_price = if slice.valid_prices.is_empty() {
            0.0
        } else {
            mean(&slice.valid_prices)
        };
        let (min, max) = if slice.valid_prices.is_empty() {
            (0.0, 0.0)
        } else {
            (
                slice.valid_prices.iter().copied().fold(f64::INFINITY, f64::min),
                slice.valid_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        let mut entry = Map::new();
        entry.insert("total_products".into(), Value::from(slice.records.len()));
        entry.insert("avg_price".into(), Value::from(avg_price));
        let mut range = Map::new();
        range.insert("min".into(), Value::from(min));
        range.insert("max".into(), Value::from(max));
        entry.insert("price_range".into(), Value::Object(range));
        entry.insert(
            "market_share".into(),
            Value::from(slice.records.len() as f64 / records.len() as f64 * 100.0),
        );
        if !slice.ratings.is_empty() {
            entry.insert("avg_rating".into(), Value::from(mean(&slice.ratings)));
            entry.insert("rating_count".into(), Value::from(slice.ratings.len()));
        }
        out.insert(slice.name.clone(), Value::Object(entry));
    }

    if slices.len() > 1 {
        let priced: Vec<(&str, f64)> = slices
            .iter()
            .filter(|s| !s.valid_prices.is_empty())
            .map(|s| (s.name.as_str(), mean(&s.valid_prices)))
            .collect();
        if !priced.is_empty() {
            let cheapest = priced
                .iter()
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .copied()
                .unwrap_or(("", 0.0));
            let most_expensive = priced
                .iter()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .copied()
                .unwrap_or(("", 0.0));

            let mut summary = Map::new();
            summary.insert("cheapest_platform".into(), Value::from(cheapest.0));
            summary.insert(
                "most_expensive_platform".into(),
                Value::from(most_expensive.0),
            );
            summary.insert(
                "price_spread_percent".into(),
                Value::from(percentage_change(cheapest.1, most_expensive.1)),
            );
            out.insert("summary".into(), Value::Object(summary));
        }
    }

    Value::Object(out)
}

fn price_comparison(records: &[ProductRecord]) -> Value {
    let slices = slices(records);
    let mut out = Map::new();

    let mut platform_stats = Map::new();
    let mut means: Vec<(String, f64)> = Vec::new();
    for slice in &slices {
        if slice.valid_prices.is_empty() {
            continue;
        }
        let mut sorted = slice.valid_prices.clone();
        sorted.sort_by(f64::total_cmp);

        let mut stats = Map::new();
        stats.insert("mean".into(), Value::from(mean(&sorted)));
        stats.insert("median".into(), Value::from(percentile(&sorted, 0.5)));
        stats.insert("std".into(), Value::from(sample_std(&sorted)));
        stats.insert("min".into(), Value::from(sorted[0]));
        stats.insert("max".into(), Value::from(sorted[sorted.len() - 1]));
        stats.insert("q25".into(), Value::from(percentile(&sorted, 0.25)));
        stats.insert("q75".into(), Value::from(percentile(&sorted, 0.75)));
        platform_stats.insert(slice.name.clone(), Value::Object(stats));
        means.push((slice.name.clone(), mean(&sorted)));
    }
    out.insert("platform_price_stats".into(), Value::Object(platform_stats));

    if means.len() > 1 {
        let most_competitive = means
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .cloned()
            .unwrap_or_default();

        let mut savings = Map::new();
        for (platform, avg) in &means {
            if *platform == most_competitive.0 {
                continue;
            }
            let mut entry = Map::new();
            entry.insert(
                "absolute_savings".into(),
                Value::from(avg - most_competitive.1),
            );
            entry.insert(
                "percent_savings".into(),
                Value::from(percentage_change(most_competitive.1, *avg)),
            );
            savings.insert(platform.clone(), Value::Object(entry));
        }

        let mut competitiveness = Map::new();
        competitiveness.insert(
            "most_competitive_platform".into(),
            Value::from(most_competitive.0),
        );
        competitiveness.insert("potential_savings".into(), Value::Object(savings));
        out.insert("competitiveness".into(), Value::Object(competitiveness));
    }

    out.insert("price_brackets".into(), brackets_by_platform(&slices));
    Value::Object(out)
}

/// Five equal-width brackets over the global valid price range, counted per
/// platform.
fn brackets_by_platform(slices: &[PlatformSlice<'_>]) -> Value {
    let all_prices: Vec<f64> = slices.iter().flat_map(|s| s.valid_prices.clone()).collect();
    if all_prices.is_empty() {
        return Value::Object(Map::new());
    }
    let min = all_prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = all_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let size = (max - min) / 5.0;
    if size <= 0.0 {
        return Value::Object(Map::new());
    }

    let brackets: Vec<(f64, f64, String)> = (0..5)
        .map(|i| {
            let start = min + i as f64 * size;
            let end = min + (i + 1) as f64 * size;
            (start, end, format!("${start:.0}-${end:.0}"))
        })
        .collect();

    let mut out = Map::new();
    for slice in slices {
        if slice.valid_prices.is_empty() {
            continue;
        }
        let mut per_platform = Map::new();
        for (i, (start, end, label)) in brackets.iter().enumerate() {
            let is_last = i == brackets.len() - 1;
            let count = slice
                .valid_prices
                .iter()
                .filter(|&&p| p >= *start && (p < *end || (is_last && p <= *end)))
                .count();
            let mut entry = Map::new();
            entry.insert("count".into(), Value::from(count));
            entry.insert(
                "percentage".into(),
                Value::from(count as f64 / slice.valid_prices.len() as f64 * 100.0),
            );
            per_platform.insert(label.clone(), Value::Object(entry));
        }
        out.insert(slice.name.clone(), Value::Object(per_platform));
    }
    Value::Object(out)
}

fn feature_comparison(records: &[ProductRecord]) -> Value {
    let slices = slices(records);
    let mut out = Map::new();

    let mut rating_stats = Map::new();
    for slice in &slices {
        if slice.ratings.is_empty() {
            continue;
        }
        let mut sorted = slice.ratings.clone();
        sorted.sort_by(f64::total_cmp);
        let mut entry = Map::new();
        entry.insert("avg_rating".into(), Value::from(mean(&sorted)));
        entry.insert("median_rating".into(), Value::from(percentile(&sorted, 0.5)));
        entry.insert("rating_count".into(), Value::from(sorted.len()));
        entry.insert(
            "high_rated_products".into(),
            Value::from(sorted.iter().filter(|&&r| r >= 4.0).count()),
        );
        entry.insert(
            "low_rated_products".into(),
            Value::from(sorted.iter().filter(|&&r| r <= 2.0).count()),
        );
        rating_stats.insert(slice.name.clone(), Value::Object(entry));
    }
    if !rating_stats.is_empty() {
        out.insert("ratings".into(), Value::Object(rating_stats));
    }

    let mut availability_stats = Map::new();
    for slice in &slices {
        let mut distribution: Map<String, Value> = Map::new();
        for record in &slice.records {
            if record.availability.is_empty() {
                continue;
            }
            let counter = distribution
                .entry(record.availability.clone())
                .or_insert(Value::from(0u64));
            *counter = Value::from(counter.as_u64().unwrap_or(0) + 1);
        }
        let in_stock = distribution.get("Available").and_then(Value::as_u64).unwrap_or(0)
            + distribution.get("In Stock").and_then(Value::as_u64).unwrap_or(0);

        let mut entry = Map::new();
        entry.insert("total_products".into(), Value::from(slice.records.len()));
        entry.insert("availability_distribution".into(), Value::Object(distribution));
        entry.insert(
            "in_stock_percentage".into(),
            Value::from(in_stock as f64 / slice.records.len() as f64 * 100.0),
        );
        availability_stats.insert(slice.name.clone(), Value::Object(entry));
    }
    out.insert("availability".into(), Value::Object(availability_stats));

    let mut brand_stats = Map::new();
    for slice in &slices {
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut with_brand = 0usize;
        for record in &slice.records {
            let Some(brand) = &record.brand else { continue };
            with_brand += 1;
            match counts.iter_mut().find(|(b, _)| b == brand) {
                Some((_, c)) => *c += 1,
                None => counts.push((brand.clone(), 1)),
            }
        }
        if with_brand == 0 {
            continue;
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top: Map<String, Value> = counts
            .iter()
            .take(5)
            .map(|(b, c)| (b.clone(), Value::from(*c)))
            .collect();

        let mut entry = Map::new();
        entry.insert("unique_brands".into(), Value::from(counts.len()));
        entry.insert("products_with_brand_info".into(), Value::from(with_brand));
        entry.insert("top_brands".into(), Value::Object(top));
        brand_stats.insert(slice.name.clone(), Value::Object(entry));
    }
    if !brand_stats.is_empty() {
        out.insert("brands".into(), Value::Object(brand_stats));
    }

    Value::Object(out)
}

fn market_positioning(records: &[ProductRecord]) -> Value {
    let slices = slices(records);
    let market_prices: Vec<f64> = records
        .iter()
        .filter(|r| r.has_valid_price())
        .map(|r| r.price)
        .collect();
    let market_ratings: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();

    let mut out = Map::new();
    for slice in &slices {
        let price_position = if slice.valid_prices.is_empty() || market_prices.is_empty() {
            "unknown"
        } else {
            let platform_avg = mean(&slice.valid_prices);
            let market_avg = mean(&market_prices);
            if platform_avg < market_avg * 0.9 {
                "budget"
            } else if platform_avg > market_avg * 1.1 {
                "premium"
            } else {
                "mainstream"
            }
        };

        let mut entry = Map::new();
        entry.insert("price_positioning".into(), Value::from(price_position));

        if !slice.ratings.is_empty() && !market_ratings.is_empty() {
            let platform_avg = mean(&slice.ratings);
            let market_avg = mean(&market_ratings);
            let quality = if platform_avg > market_avg + 0.2 {
                "high_quality"
            } else if platform_avg < market_avg - 0.2 {
                "low_quality"
            } else {
                "average"
            };
            entry.insert("quality_positioning".into(), Value::from(quality));
        }
        out.insert(slice.name.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

fn value_analysis(records: &[ProductRecord]) -> Value {
    let slices = slices(records);
    let market_prices: Vec<f64> = records
        .iter()
        .filter(|r| r.has_valid_price())
        .map(|r| r.price)
        .collect();
    let market_avg = if market_prices.is_empty() {
        0.0
    } else {
        mean(&market_prices)
    };

    let mut out = Map::new();
    for slice in &slices {
        let competitive = !slice.valid_prices.is_empty() && mean(&slice.valid_prices) < market_avg;
        let consistent = !slice.valid_prices.is_empty() && {
            let m = mean(&slice.valid_prices);
            m > 0.0 && sample_std(&slice.valid_prices) / m < 0.3
        };

        let mut price_value = Map::new();
        price_value.insert("competitive_pricing".into(), Value::from(competitive));
        price_value.insert("price_consistency".into(), Value::from(consistent));

        let mut quality_value = Map::new();
        let mut high_quality = false;
        let mut consistent_quality = false;
        if !slice.ratings.is_empty() {
            high_quality = slice.ratings.iter().filter(|&&r| r >= 4.0).count() as f64
                / slice.ratings.len() as f64
                > 0.6;
            consistent_quality = sample_std(&slice.ratings) < 0.5;
            quality_value.insert("high_quality_products".into(), Value::from(high_quality));
            quality_value.insert("consistent_quality".into(), Value::from(consistent_quality));
        }

        let mut score = 0u64;
        if competitive {
            score += 30;
        }
        if consistent {
            score += 20;
        }
        if high_quality {
            score += 30;
        }
        if consistent_quality {
            score += 20;
        }
        let tier = if score >= 70 {
            "high"
        } else if score >= 40 {
            "medium"
        } else {
            "low"
        };

        let mut entry = Map::new();
        entry.insert("price_value".into(), Value::Object(price_value));
        entry.insert("quality_value".into(), Value::Object(quality_value));
        entry.insert("overall_value_score".into(), Value::from(score));
        entry.insert("value_tier".into(), Value::from(tier));
        out.insert(slice.name.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

fn platform_strengths(records: &[ProductRecord]) -> Value {
    let slices = slices(records);
    let platform_count = slices.len().max(1);
    let market_prices: Vec<f64> = records
        .iter()
        .filter(|r| r.has_valid_price())
        .map(|r| r.price)
        .collect();
    let market_ratings: Vec<f64> = records.iter().filter_map(|r| r.rating).collect();
    let market_in_stock_rate = in_stock_rate(records.iter());

    let mut out = Map::new();
    for slice in &slices {
        let mut strengths: Vec<&str> = Vec::new();
        let mut weaknesses: Vec<&str> = Vec::new();

        if !slice.valid_prices.is_empty() && !market_prices.is_empty() {
            let platform_avg = mean(&slice.valid_prices);
            let market_avg = mean(&market_prices);
            if platform_avg < market_avg {
                strengths.push("Competitive pricing");
            } else if platform_avg > market_avg * 1.2 {
                weaknesses.push("Higher prices than market average");
            }
        }

        let fair_share = records.len() as f64 / platform_count as f64;
        if slice.records.len() as f64 > fair_share * 1.2 {
            strengths.push("Large product selection");
        } else if (slice.records.len() as f64) < fair_share * 0.8 {
            weaknesses.push("Limited product selection");
        }

        if !slice.ratings.is_empty() && !market_ratings.is_empty() {
            let platform_avg = mean(&slice.ratings);
            let market_avg = mean(&market_ratings);
            if platform_avg > market_avg {
                strengths.push("Higher quality products");
            } else if platform_avg < market_avg - 0.3 {
                weaknesses.push("Lower quality products");
            }
        }

        let platform_in_stock = in_stock_rate(slice.records.iter().copied());
        if platform_in_stock > market_in_stock_rate {
            strengths.push("Good product availability");
        } else if platform_in_stock < market_in_stock_rate - 0.1 {
            weaknesses.push("Poor product availability");
        }

        let score = strengths.len() as i64 - weaknesses.len() as i64;
        let mut entry = Map::new();
        entry.insert(
            "strengths".into(),
            Value::from(strengths.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
        );
        entry.insert(
            "weaknesses".into(),
            Value::from(weaknesses.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
        );
        entry.insert("overall_score".into(), Value::from(score));
        out.insert(slice.name.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

fn in_stock_rate<'a>(records: impl Iterator<Item = &'a ProductRecord>) -> f64 {
    let mut total = 0usize;
    let mut in_stock = 0usize;
    for record in records {
        total += 1;
        let availability = record.availability.to_lowercase();
        if availability.contains("available") || availability.contains("in stock") {
            in_stock += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        in_stock as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(platform: &str, id: &str, name: &str, price: f64) -> ProductRecord {
        ProductRecord::new(platform, id, name, price, "USD", "In Stock", "https://x/p")
    }

    fn sample() -> Vec<ProductRecord> {
        let mut records = vec![
            record("amazon", "1", "Apple iPhone 15 Pro 256GB", 999.0),
            record("ebay", "2", "iPhone15 Pro 256G", 949.0),
            record("jd", "3", "Samsung Galaxy S24", 899.0),
            record("amazon", "4", "USB-C Cable 2m", 9.0),
        ];
        records[0].rating = Some(4.7);
        records[1].rating = Some(4.4);
        records[2].rating = Some(4.5);
        records[0].brand = Some("Apple".to_string());
        records[1].brand = Some("Apple".to_string());
        records[2].brand = Some("Samsung".to_string());
        records
    }

    #[test]
    fn analysis_carries_all_sections() {
        let result = ComparisonAnalyzer::default().analyze(&sample()).unwrap();
        for key in [
            "platform_overview",
            "price_comparison",
            "feature_comparison",
            "matched_products",
            "market_positioning",
            "value_analysis",
            "platform_analysis",
        ] {
            assert!(result.data.contains_key(key), "missing {key}");
        }
        assert_eq!(result.metadata["platforms_compared"], Value::from(3));
    }

    #[test]
    fn overview_summary_spreads_across_platforms() {
        let result = ComparisonAnalyzer::default().analyze(&sample()).unwrap();
        let summary = &result.data["platform_overview"]["summary"];
        // amazon's average is dragged down by the cheap cable
        assert_eq!(summary["cheapest_platform"], Value::from("amazon"));
        assert_eq!(summary["most_expensive_platform"], Value::from("ebay"));
    }

    #[test]
    fn matching_section_finds_the_iphone_pair() {
        let result = ComparisonAnalyzer::default().analyze(&sample()).unwrap();
        let matched = &result.data["matched_products"];
        assert_eq!(matched["match_count"], Value::from(1));
        let matches = matched["matches"].as_array().unwrap();
        let spread = &matches[0]["price_spread"];
        assert_eq!(spread["cheapest_platform"], Value::from("ebay"));
    }

    #[test]
    fn positioning_tiers_platforms_by_price() {
        let records = vec![
            record("cheap", "1", "Widget", 50.0),
            record("mid", "2", "Widget", 100.0),
            record("lux", "3", "Widget", 160.0),
        ];
        let result = ComparisonAnalyzer::default().analyze(&records).unwrap();
        let positioning = &result.data["market_positioning"];
        assert_eq!(positioning["cheap"]["price_positioning"], Value::from("budget"));
        assert_eq!(positioning["lux"]["price_positioning"], Value::from("premium"));
        assert_eq!(positioning["mid"]["price_positioning"], Value::from("mainstream"));
    }

    #[test]
    fn brand_comparison_counts_unique_brands() {
        let result = ComparisonAnalyzer::default().analyze(&sample()).unwrap();
        let brands = &result.data["feature_comparison"]["brands"];
        assert_eq!(brands["amazon"]["unique_brands"], Value::from(1));
        assert_eq!(brands["amazon"]["top_brands"]["Apple"], Value::from(1));
    }
}
