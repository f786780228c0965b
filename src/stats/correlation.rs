//! Pearson correlation over the numeric columns of a record batch.
//! Pairwise-complete observations: each pair uses only the rows where both
//! columns are present.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ComputationWarning, Section};
use crate::types::ProductRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub variable1: String,
    pub variable2: String,
    pub correlation: f64,
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    /// column → column → r; `null` where the coefficient is undefined
    /// (fewer than two complete pairs or zero variance).
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    pub strong_correlations: Vec<CorrelationPair>,
}

/// Correlate price, rating, and review_count where present. Requires at
/// least two populated numeric columns.
pub fn analyze(records: &[ProductRecord]) -> Section<CorrelationReport> {
    let mut columns: Vec<(&str, Vec<Option<f64>>)> = Vec::new();

    let price: Vec<Option<f64>> = records.iter().map(|r| Some(r.price)).collect();
    columns.push(("price", price));

    let rating: Vec<Option<f64>> = records.iter().map(|r| r.rating).collect();
    if rating.iter().any(Option::is_some) {
        columns.push(("rating", rating));
    }

    let reviews: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.review_count.map(|c| c as f64))
        .collect();
    if reviews.iter().any(Option::is_some) {
        columns.push(("review_count", reviews));
    }

    if columns.len() < 2 {
        return Err(ComputationWarning::new(
            "correlation_analysis",
            "insufficient numerical variables for correlation analysis",
        ));
    }

    let mut matrix: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    let mut strong: Vec<CorrelationPair> = Vec::new();

    for (i, (name_a, col_a)) in columns.iter().enumerate() {
        let mut row = BTreeMap::new();
        for (j, (name_b, col_b)) in columns.iter().enumerate() {
            let r = if i == j {
                Some(1.0)
            } else {
                pearson(col_a, col_b)
            };
            row.insert((*name_b).to_string(), r);

            if j > i {
                if let Some(r) = r {
                    if r.abs() > 0.5 {
                        strong.push(CorrelationPair {
                            variable1: (*name_a).to_string(),
                            variable2: (*name_b).to_string(),
                            correlation: r,
                            strength: if r.abs() > 0.7 { "strong" } else { "moderate" }
                                .to_string(),
                        });
                    }
                }
            }
        }
        matrix.insert((*name_a).to_string(), row);
    }

    Ok(CorrelationReport {
        correlation_matrix: matrix,
        strong_correlations: strong,
    })
}

/// Pearson r over rows where both values are present; `None` when fewer
/// than two complete pairs exist or either side has zero variance.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: f64, rating: Option<f64>, reviews: Option<u64>) -> ProductRecord {
        let mut r = ProductRecord::new("amazon", "id", "Widget", price, "USD", "In Stock", "u");
        r.rating = rating;
        r.review_count = reviews;
        r
    }

    #[test]
    fn price_only_reports_insufficient_data() {
        let records = vec![record(10.0, None, None), record(20.0, None, None)];
        let out = analyze(&records);
        assert!(out.is_err());
    }

    #[test]
    fn perfectly_correlated_columns() {
        let records: Vec<ProductRecord> = (1..=5)
            .map(|i| record(i as f64 * 10.0, Some(i as f64), Some(i * 100)))
            .collect();
        let report = analyze(&records).unwrap();
        let r = report.correlation_matrix["price"]["rating"].unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert!(report
            .strong_correlations
            .iter()
            .any(|p| p.strength == "strong"));
    }

    #[test]
    fn constant_column_yields_null_not_nan() {
        let records = vec![
            record(10.0, Some(4.0), None),
            record(20.0, Some(4.0), None),
            record(30.0, Some(4.0), None),
        ];
        let report = analyze(&records).unwrap();
        assert!(report.correlation_matrix["price"]["rating"].is_none());
        assert!(report.strong_correlations.is_empty());
    }

    #[test]
    fn pairwise_complete_observations() {
        // the rating column has a hole; the pair uses only complete rows
        let records = vec![
            record(10.0, Some(2.0), None),
            record(20.0, None, None),
            record(30.0, Some(4.0), None),
        ];
        let report = analyze(&records).unwrap();
        let r = report.correlation_matrix["price"]["rating"].unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }
}
