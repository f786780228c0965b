//! Descriptive statistics over a price column. Pure functions of the
//! numeric data; callers filter to valid (strictly positive) prices first.

use std::collections::BTreeMap;

use serde::Serialize;

/// Named percentiles reported in every summary.
pub const SUMMARY_PERCENTILES: [u8; 7] = [5, 10, 25, 50, 75, 90, 95];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticalSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Smallest of the most frequent values.
    pub mode: f64,
    /// Sample standard deviation (n−1 denominator); zero for a single point.
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub percentiles: BTreeMap<String, f64>,
    /// Bias-corrected sample skewness; absent below three points or for
    /// constant data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skewness: Option<f64>,
    /// Bias-corrected excess kurtosis; absent below four points or for
    /// constant data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurtosis: Option<f64>,
    pub coefficient_of_variation: f64,
    pub iqr: f64,
    pub quartile_deviation: f64,
    pub mean_absolute_deviation: f64,
}

/// Full summary of a non-empty value slice.
pub fn summarize(values: &[f64]) -> Option<StatisticalSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = mean(&sorted);
    let std = sample_std(&sorted);
    let min = sorted[0];
    let max = sorted[count - 1];
    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;

    let percentiles = SUMMARY_PERCENTILES
        .iter()
        .map(|&p| (format!("p{p}"), percentile(&sorted, f64::from(p) / 100.0)))
        .collect();

    Some(StatisticalSummary {
        count,
        mean,
        median: percentile(&sorted, 0.5),
        mode: mode(&sorted),
        std,
        variance: std * std,
        min,
        max,
        range: max - min,
        percentiles,
        skewness: skewness(&sorted),
        kurtosis: kurtosis(&sorted),
        coefficient_of_variation: if mean != 0.0 { std / mean } else { 0.0 },
        iqr,
        quartile_deviation: iqr / 2.0,
        mean_absolute_deviation: sorted.iter().map(|x| (x - mean).abs()).sum::<f64>()
            / count as f64,
    })
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance, n−1 denominator. Zero for fewer than two points.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (n - 1) as f64
}

pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Population variance, n denominator.
pub fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / values.len() as f64
}

pub fn population_std(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

pub fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 0.5)
}

/// Linearly interpolated percentile over an ascending slice, q in [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = lo + 1;
    if hi >= n {
        return sorted[n - 1];
    }
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Smallest of the most frequent values in an ascending slice.
pub fn mode(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_count = 0usize;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

/// Bias-corrected sample skewness (the Fisher-Pearson G1 estimate).
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 3 {
        return None;
    }
    let m = mean(values);
    let m2 = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|x| (x - m).powi(3)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return None;
    }
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}

/// Bias-corrected excess kurtosis (the G2 estimate).
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    if values.len() < 4 {
        return None;
    }
    let m = mean(values);
    let m2 = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    let m4 = values.iter().map(|x| (x - m).powi(4)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return None;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    Some(((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0)))
}

/// Biased (population) skewness and non-excess kurtosis, as used by the
/// moment-based normality tests.
pub fn population_moments(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len() as f64;
    let m = mean(values);
    let m2 = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return None;
    }
    let m3 = values.iter().map(|x| (x - m).powi(3)).sum::<f64>() / n;
    let m4 = values.iter().map(|x| (x - m).powi(4)).sum::<f64>() / n;
    Some((m3 / m2.powf(1.5), m4 / (m2 * m2)))
}
