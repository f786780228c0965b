//! Price-trend analysis over time-ordered observations: least-squares
//! trend, moving averages, rolling volatility, local peaks/troughs, a naive
//! linear projection, and per-platform trends.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::analyzer::{platforms_in_order, validate_records};
use crate::error::Result;
use crate::stats::describe::{mean, sample_std};
use crate::stats::special::t_two_sided;
use crate::types::{AnalysisResult, ProductRecord};
use crate::util::percentage_change;

/// Default moving-average / volatility window, in observations.
const DEFAULT_WINDOW: usize = 7;
/// Minimum |slope| (currency units per day) before a trend is called.
const DEFAULT_TREND_THRESHOLD: f64 = 0.05;

pub struct TrendAnalyzer {
    window_size: usize,
    trend_threshold: f64,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_TREND_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy)]
struct Regression {
    slope_per_day: f64,
    intercept: f64,
    r: f64,
    p_value: f64,
}

impl TrendAnalyzer {
    pub fn new(window_size: usize, trend_threshold: f64) -> Self {
        Self {
            window_size: window_size.max(2),
            trend_threshold,
        }
    }

    pub fn analyze(&self, records: &[ProductRecord]) -> Result<AnalysisResult> {
        validate_records(records)?;

        let mut observations: Vec<(DateTime<Utc>, f64, &ProductRecord)> = records
            .iter()
            .map(|r| (r.timestamp, r.price, r))
            .collect();
        observations.sort_by_key(|(t, _, _)| *t);
        let prices: Vec<f64> = observations.iter().map(|(_, p, _)| *p).collect();

        let mut data = Map::new();
        data.insert(
            "overall_trend".into(),
            self.overall_trend(&observations, &prices),
        );
        data.insert("moving_averages".into(), self.moving_averages(&prices));
        data.insert("volatility".into(), self.volatility(&prices));
        data.insert("peaks_troughs".into(), peaks_troughs(&prices));
        data.insert(
            "trend_prediction".into(),
            self.prediction(&observations, &prices),
        );
        data.insert("platform_trends".into(), self.platform_trends(records));

        let span_days = (observations[observations.len() - 1].0 - observations[0].0).num_days();
        let mut metadata = Map::new();
        metadata.insert("data_points".into(), Value::from(records.len()));
        metadata.insert("time_span_days".into(), Value::from(span_days));
        metadata.insert("window_size".into(), Value::from(self.window_size));

        Ok(AnalysisResult::new("trend_analysis", data, metadata))
    }

    fn overall_trend(
        &self,
        observations: &[(DateTime<Utc>, f64, &ProductRecord)],
        prices: &[f64],
    ) -> Value {
        let Some(reg) = regress(observations) else {
            let mut out = Map::new();
            out.insert(
                "note".into(),
                Value::from("insufficient time variation for trend analysis"),
            );
            return Value::Object(out);
        };

        let direction = if reg.slope_per_day.abs() <= self.trend_threshold {
            "stable"
        } else if reg.slope_per_day > 0.0 {
            "increasing"
        } else {
            "decreasing"
        };
        let total_change = if prices.len() > 1 {
            percentage_change(prices[0], prices[prices.len() - 1])
        } else {
            0.0
        };
        let confidence = if reg.p_value < 0.05 {
            "high"
        } else if reg.p_value < 0.1 {
            "medium"
        } else {
            "low"
        };

        let mut out = Map::new();
        out.insert("direction".into(), Value::from(direction));
        out.insert("slope_per_day".into(), Value::from(reg.slope_per_day));
        out.insert("strength".into(), Value::from(reg.r.abs().min(1.0)));
        out.insert("r_squared".into(), Value::from(reg.r * reg.r));
        out.insert("p_value".into(), Value::from(reg.p_value));
        out.insert("total_change_percent".into(), Value::from(total_change));
        out.insert("confidence".into(), Value::from(confidence));
        Value::Object(out)
    }

    fn moving_averages(&self, prices: &[f64]) -> Value {
        let mut out = Map::new();
        out.insert("window_size".into(), Value::from(self.window_size));
        if prices.len() < self.window_size {
            out.insert("values".into(), Value::from(Vec::<f64>::new()));
            return Value::Object(out);
        }
        let values: Vec<f64> = prices
            .windows(self.window_size)
            .map(mean)
            .collect();
        out.insert(
            "latest".into(),
            values.last().copied().map(Value::from).unwrap_or(Value::Null),
        );
        out.insert("values".into(), Value::from(values));
        Value::Object(out)
    }

    fn volatility(&self, prices: &[f64]) -> Value {
        let mut out = Map::new();
        if prices.len() < self.window_size {
            out.insert(
                "note".into(),
                Value::from("not enough observations for rolling volatility"),
            );
            return Value::Object(out);
        }
        let rolling: Vec<f64> = prices
            .windows(self.window_size)
            .map(sample_std)
            .collect();
        let avg = mean(&rolling);
        let max = rolling.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let overall_mean = mean(prices);
        let cv = if overall_mean != 0.0 {
            sample_std(prices) / overall_mean
        } else {
            0.0
        };
        let level = if cv > 0.3 {
            "high"
        } else if cv > 0.15 {
            "medium"
        } else {
            "low"
        };

        out.insert("average_volatility".into(), Value::from(avg));
        out.insert("max_volatility".into(), Value::from(max));
        out.insert(
            "current_volatility".into(),
            rolling.last().copied().map(Value::from).unwrap_or(Value::Null),
        );
        out.insert("coefficient_of_variation".into(), Value::from(cv));
        out.insert("volatility_level".into(), Value::from(level));
        Value::Object(out)
    }

    fn prediction(
        &self,
        observations: &[(DateTime<Utc>, f64, &ProductRecord)],
        prices: &[f64],
    ) -> Value {
        let mut out = Map::new();
        let Some(reg) = regress(observations) else {
            out.insert("note".into(), Value::from("insufficient data for prediction"));
            return Value::Object(out);
        };

        let last_day = observations[observations.len() - 1]
            .0
            .timestamp() as f64
            / 86_400.0;
        let predicted = reg.slope_per_day * (last_day + 7.0) + reg.intercept;
        let direction = if reg.slope_per_day > 0.0 { "up" } else { "down" };
        let r2 = reg.r * reg.r;
        let confidence = if r2 > 0.7 {
            "high"
        } else if r2 > 0.4 {
            "medium"
        } else {
            "low"
        };

        out.insert(
            "predicted_price_7d".into(),
            Value::from(predicted.max(0.0)),
        );
        out.insert("current_price".into(), Value::from(prices[prices.len() - 1]));
        out.insert("trend_direction".into(), Value::from(direction));
        out.insert("confidence".into(), Value::from(confidence));
        Value::Object(out)
    }

    fn platform_trends(&self, records: &[ProductRecord]) -> Value {
        let mut out = Map::new();
        for platform in platforms_in_order(records) {
            let mut observations: Vec<(DateTime<Utc>, f64, &ProductRecord)> = records
                .iter()
                .filter(|r| r.platform == platform)
                .map(|r| (r.timestamp, r.price, r))
                .collect();
            if observations.len() < 3 {
                continue;
            }
            observations.sort_by_key(|(t, _, _)| *t);
            let Some(reg) = regress(&observations) else {
                continue;
            };

            let direction = if reg.slope_per_day.abs() <= self.trend_threshold {
                "stable"
            } else if reg.slope_per_day > 0.0 {
                "increasing"
            } else {
                "decreasing"
            };
            let first = observations[0].1;
            let last = observations[observations.len() - 1].1;

            let mut entry = Map::new();
            entry.insert("direction".into(), Value::from(direction));
            entry.insert("slope_per_day".into(), Value::from(reg.slope_per_day));
            entry.insert(
                "change_percent".into(),
                Value::from(percentage_change(first, last)),
            );
            entry.insert("data_points".into(), Value::from(observations.len()));
            out.insert(platform, Value::Object(entry));
        }
        Value::Object(out)
    }
}

/// Least-squares fit of price against time in days. `None` when there are
/// fewer than two observations or no time variation.
fn regress(observations: &[(DateTime<Utc>, f64, &ProductRecord)]) -> Option<Regression> {
    let n = observations.len();
    if n < 2 {
        return None;
    }
    let xs: Vec<f64> = observations
        .iter()
        .map(|(t, _, _)| t.timestamp() as f64 / 86_400.0)
        .collect();
    let ys: Vec<f64> = observations.iter().map(|(_, p, _)| *p).collect();

    let mean_x = mean(&xs);
    let mean_y = mean(&ys);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
        syy += (y - mean_y) * (y - mean_y);
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r = if syy == 0.0 {
        0.0
    } else {
        sxy / (sxx.sqrt() * syy.sqrt())
    };

    let p_value = if n > 2 && r.abs() < 1.0 {
        let df = (n - 2) as f64;
        let t = r * (df / (1.0 - r * r)).sqrt();
        t_two_sided(t, df)
    } else {
        0.0
    };

    Some(Regression {
        slope_per_day: slope,
        intercept,
        r,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(day: i64, price: f64) -> ProductRecord {
        let mut r = ProductRecord::new("amazon", "p1", "Widget", price, "USD", "In Stock", "u");
        r.timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day);
        r
    }

    #[test]
    fn rising_prices_are_called_increasing() {
        let records: Vec<ProductRecord> =
            (0..10).map(|d| record_at(d, 100.0 + d as f64 * 2.0)).collect();
        let result = TrendAnalyzer::default().analyze(&records).unwrap();
        let trend = &result.data["overall_trend"];
        assert_eq!(trend["direction"], Value::from("increasing"));
        assert!((trend["slope_per_day"].as_f64().unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(trend["confidence"], Value::from("high"));
    }

    #[test]
    fn flat_prices_are_stable() {
        let records: Vec<ProductRecord> = (0..8).map(|d| record_at(d, 100.0)).collect();
        let result = TrendAnalyzer::default().analyze(&records).unwrap();
        assert_eq!(result.data["overall_trend"]["direction"], Value::from("stable"));
    }

    #[test]
    fn identical_timestamps_degrade_to_a_note() {
        let records: Vec<ProductRecord> = (0..5).map(|_| record_at(0, 100.0)).collect();
        let result = TrendAnalyzer::default().analyze(&records).unwrap();
        assert!(result.data["overall_trend"]["note"].is_string());
    }

    #[test]
    fn moving_average_smooths_the_series() {
        let records: Vec<ProductRecord> =
            (0..9).map(|d| record_at(d, 100.0 + d as f64)).collect();
        let result = TrendAnalyzer::new(3, 0.05).analyze(&records).unwrap();
        let values = result.data["moving_averages"]["values"].as_array().unwrap();
        assert_eq!(values.len(), 7);
        assert!((values[0].as_f64().unwrap() - 101.0).abs() < 1e-9);
    }

    #[test]
    fn prediction_extrapolates_the_slope() {
        let records: Vec<ProductRecord> =
            (0..10).map(|d| record_at(d, 100.0 + d as f64)).collect();
        let result = TrendAnalyzer::default().analyze(&records).unwrap();
        let predicted = result.data["trend_prediction"]["predicted_price_7d"]
            .as_f64()
            .unwrap();
        // last price 109, slope 1/day, 7 days out
        assert!((predicted - 116.0).abs() < 1e-6);
    }

    #[test]
    fn metadata_reports_time_span() {
        let records: Vec<ProductRecord> = (0..5).map(|d| record_at(d * 2, 50.0)).collect();
        let result = TrendAnalyzer::default().analyze(&records).unwrap();
        assert_eq!(result.metadata["time_span_days"], Value::from(8i64));
    }
}
