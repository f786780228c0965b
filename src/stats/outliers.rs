//! Outlier detection over valid prices. Three interchangeable methods,
//! selected per analysis run; each reports counts, flagged values, and
//! (for the IQR and z-score methods) the contributing records.

use serde::Serialize;

use crate::config::{IQR_FENCE, MAD_SCALE};
use crate::stats::describe::{mean, median, percentile, population_std};
use crate::types::{OutlierMethod, ProductRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

/// name/platform/price of a flagged record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierProduct {
    pub name: String,
    pub platform: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub outlier_count: usize,
    pub outlier_percentage: f64,
    pub outlier_values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<OutlierBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_products: Option<Vec<OutlierProduct>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Detect outliers among records with a valid price. `records` must be the
/// already-filtered valid subset; prices are read straight from them.
pub fn detect(
    records: &[&ProductRecord],
    method: OutlierMethod,
    zscore_threshold: f64,
    modified_zscore_threshold: f64,
) -> OutlierReport {
    match method {
        OutlierMethod::Iqr => detect_iqr(records),
        OutlierMethod::Zscore => detect_zscore(records, zscore_threshold),
        OutlierMethod::ModifiedZscore => detect_modified_zscore(records, modified_zscore_threshold),
    }
}

fn detect_iqr(records: &[&ProductRecord]) -> OutlierReport {
    let mut sorted: Vec<f64> = records.iter().map(|r| r.price).collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    let flagged: Vec<&&ProductRecord> = records
        .iter()
        .filter(|r| r.price < lower || r.price > upper)
        .collect();

    OutlierReport {
        method: OutlierMethod::Iqr,
        threshold: None,
        outlier_count: flagged.len(),
        outlier_percentage: flagged.len() as f64 / records.len() as f64 * 100.0,
        outlier_values: flagged.iter().map(|r| r.price).collect(),
        bounds: Some(OutlierBounds { lower, upper }),
        outlier_products: Some(flagged.iter().map(|r| product_ref(r)).collect()),
        note: None,
    }
}

fn detect_zscore(records: &[&ProductRecord], threshold: f64) -> OutlierReport {
    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
    let m = mean(&prices);
    let sd = population_std(&prices);

    let flagged: Vec<&&ProductRecord> = if sd > 0.0 {
        records
            .iter()
            .filter(|r| ((r.price - m) / sd).abs() > threshold)
            .collect()
    } else {
        Vec::new()
    };

    OutlierReport {
        method: OutlierMethod::Zscore,
        threshold: Some(threshold),
        outlier_count: flagged.len(),
        outlier_percentage: flagged.len() as f64 / records.len() as f64 * 100.0,
        outlier_values: flagged.iter().map(|r| r.price).collect(),
        bounds: None,
        outlier_products: Some(flagged.iter().map(|r| product_ref(r)).collect()),
        note: None,
    }
}

fn detect_modified_zscore(records: &[&ProductRecord], threshold: f64) -> OutlierReport {
    let mut sorted: Vec<f64> = records.iter().map(|r| r.price).collect();
    sorted.sort_by(f64::total_cmp);
    let med = median(&sorted);

    let mut abs_dev: Vec<f64> = sorted.iter().map(|p| (p - med).abs()).collect();
    abs_dev.sort_by(f64::total_cmp);
    let mut mad = median(&abs_dev);
    if mad == 0.0 {
        mad = mean(&abs_dev);
    }
    if mad == 0.0 {
        return OutlierReport {
            method: OutlierMethod::ModifiedZscore,
            threshold: Some(threshold),
            outlier_count: 0,
            outlier_percentage: 0.0,
            outlier_values: Vec::new(),
            bounds: None,
            outlier_products: None,
            note: Some("no variation in data".to_string()),
        };
    }

    let flagged: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|p| (MAD_SCALE * (p - med) / mad).abs() > threshold)
        .collect();

    OutlierReport {
        method: OutlierMethod::ModifiedZscore,
        threshold: Some(threshold),
        outlier_count: flagged.len(),
        outlier_percentage: flagged.len() as f64 / sorted.len() as f64 * 100.0,
        outlier_values: flagged,
        bounds: None,
        outlier_products: None,
        note: None,
    }
}

fn product_ref(r: &ProductRecord) -> OutlierProduct {
    OutlierProduct {
        name: r.name.clone(),
        platform: r.platform.clone(),
        price: r.price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MODIFIED_ZSCORE_THRESHOLD, ZSCORE_THRESHOLD};

    fn records(prices: &[f64]) -> Vec<ProductRecord> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                ProductRecord::new("amazon", format!("p{i}"), "Widget", p, "USD", "In Stock", "u")
            })
            .collect()
    }

    fn refs(records: &[ProductRecord]) -> Vec<&ProductRecord> {
        records.iter().collect()
    }

    #[test]
    fn iqr_flags_the_far_point() {
        let rs = records(&[10.0, 11.0, 12.0, 13.0, 14.0, 100.0]);
        let report = detect(&refs(&rs), OutlierMethod::Iqr, ZSCORE_THRESHOLD, MODIFIED_ZSCORE_THRESHOLD);
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.outlier_values, vec![100.0]);
        let products = report.outlier_products.unwrap();
        assert_eq!(products[0].price, 100.0);
        assert_eq!(products[0].platform, "amazon");
    }

    #[test]
    fn iqr_is_idempotent() {
        let rs = records(&[10.0, 11.0, 12.0, 13.0, 14.0, 100.0]);
        let a = detect(&refs(&rs), OutlierMethod::Iqr, ZSCORE_THRESHOLD, MODIFIED_ZSCORE_THRESHOLD);
        let b = detect(&refs(&rs), OutlierMethod::Iqr, ZSCORE_THRESHOLD, MODIFIED_ZSCORE_THRESHOLD);
        assert_eq!(a.bounds, b.bounds);
        assert_eq!(a.outlier_values, b.outlier_values);
    }

    #[test]
    fn zscore_with_constant_prices_flags_nothing() {
        let rs = records(&[50.0, 50.0, 50.0, 50.0]);
        let report = detect(&refs(&rs), OutlierMethod::Zscore, ZSCORE_THRESHOLD, MODIFIED_ZSCORE_THRESHOLD);
        assert_eq!(report.outlier_count, 0);
    }

    #[test]
    fn modified_zscore_constant_data_reports_note_not_panic() {
        let rs = records(&[25.0, 25.0, 25.0]);
        let report = detect(&refs(&rs), OutlierMethod::ModifiedZscore, ZSCORE_THRESHOLD, MODIFIED_ZSCORE_THRESHOLD);
        assert_eq!(report.outlier_count, 0);
        assert!(report.note.is_some());
    }

    #[test]
    fn modified_zscore_flags_extreme_value() {
        let rs = records(&[10.0, 10.5, 11.0, 11.5, 12.0, 500.0]);
        let report = detect(&refs(&rs), OutlierMethod::ModifiedZscore, ZSCORE_THRESHOLD, MODIFIED_ZSCORE_THRESHOLD);
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.outlier_values, vec![500.0]);
    }
}
