//! Distribution analysis for the price column: three normality tests, a
//! categorical shape reading, and best-fit selection over a fixed candidate
//! family. Any single test that fails numerically is dropped from the
//! report; the rest of the analysis continues.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SIGNIFICANCE_LEVEL;
use crate::error::{ComputationWarning, Section};
use crate::stats::describe::{
    kurtosis, mean, population_moments, population_std, skewness,
};
use crate::stats::special::{
    beta_inc, chi2_sf, gamma_p, ks_p_value, norm_cdf, norm_ppf, norm_sf,
};

/// Minimum points for any distribution analysis.
const MIN_POINTS: usize = 3;
/// Minimum points before distribution fitting is attempted.
const MIN_FIT_POINTS: usize = 10;
/// Shapiro-Wilk is calibrated for samples up to this size.
const SHAPIRO_MAX_N: usize = 5000;
/// The D'Agostino omnibus test needs this many points for its skew term.
const DAGOSTINO_MIN_N: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
    pub is_normal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeAnalysis {
    pub skewness: f64,
    pub skewness_interpretation: String,
    pub kurtosis: f64,
    pub kurtosis_interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionFit {
    pub parameters: Vec<f64>,
    pub ks_statistic: f64,
    pub ks_p_value: f64,
    pub good_fit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub candidates: BTreeMap<String, DistributionFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_fit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionAnalysis {
    pub normality_tests: BTreeMap<String, NormalityTest>,
    /// Majority verdict over the tests that computed; absent when none did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_likely_normal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_analysis: Option<ShapeAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_fit: Option<FitReport>,
}

/// Analyze the distribution of valid prices. Fewer than three points is
/// reported as insufficient data.
pub fn analyze(prices: &[f64]) -> Section<DistributionAnalysis> {
    if prices.len() < MIN_POINTS {
        return Err(ComputationWarning::new(
            "distribution_analysis",
            "insufficient data for distribution analysis",
        ));
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut tests = BTreeMap::new();
    if let Some(t) = shapiro_wilk(&sorted) {
        tests.insert("shapiro_wilk".to_string(), t);
    }
    if let Some(t) = jarque_bera(&sorted) {
        tests.insert("jarque_bera".to_string(), t);
    }
    if let Some(t) = dagostino(&sorted) {
        tests.insert("dagostino".to_string(), t);
    }

    let is_likely_normal = if tests.is_empty() {
        None
    } else {
        let passed = tests.values().filter(|t| t.is_normal).count();
        Some(passed as f64 >= tests.len() as f64 / 2.0)
    };

    let shape_analysis = match (skewness(&sorted), kurtosis(&sorted)) {
        (Some(s), Some(k)) => Some(ShapeAnalysis {
            skewness: s,
            skewness_interpretation: interpret_skewness(s).to_string(),
            kurtosis: k,
            kurtosis_interpretation: interpret_kurtosis(k).to_string(),
        }),
        _ => None,
    };

    let distribution_fit = if sorted.len() >= MIN_FIT_POINTS {
        Some(fit_candidates(&sorted))
    } else {
        None
    };

    Ok(DistributionAnalysis {
        normality_tests: tests,
        is_likely_normal,
        shape_analysis,
        distribution_fit,
    })
}

fn interpret_skewness(s: f64) -> &'static str {
    if s.abs() < 0.5 {
        "approximately_symmetric"
    } else if s > 0.5 {
        if s < 1.0 {
            "right_skewed"
        } else {
            "highly_right_skewed"
        }
    } else if s > -1.0 {
        "left_skewed"
    } else {
        "highly_left_skewed"
    }
}

fn interpret_kurtosis(k: f64) -> &'static str {
    if k.abs() < 0.5 {
        "mesokurtic"
    } else if k > 0.5 {
        "leptokurtic"
    } else {
        "platykurtic"
    }
}

// ---------------------------------------------------------------------------
// Normality tests
// ---------------------------------------------------------------------------

/// Shapiro-Wilk W test, Royston's AS R94 approximation. Valid for
/// 3 ≤ n ≤ 5000; returns None outside that range or for constant data.
fn shapiro_wilk(sorted: &[f64]) -> Option<NormalityTest> {
    let n = sorted.len();
    if !(MIN_POINTS..=SHAPIRO_MAX_N).contains(&n) {
        return None;
    }
    let nf = n as f64;

    let m: Vec<f64> = (1..=n)
        .map(|i| norm_ppf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let m_sum_sq: f64 = m.iter().map(|v| v * v).sum();
    let u = 1.0 / nf.sqrt();

    let mut a = vec![0.0; n];
    if n == 3 {
        a[2] = std::f64::consts::FRAC_1_SQRT_2;
        a[0] = -a[2];
    } else {
        let c_n = m[n - 1] / m_sum_sq.sqrt();
        let a_n = -2.706056 * u.powi(5) + 4.434685 * u.powi(4) - 2.071190 * u.powi(3)
            - 0.147981 * u.powi(2)
            + 0.221157 * u
            + c_n;
        if n <= 5 {
            let phi = (m_sum_sq - 2.0 * m[n - 1] * m[n - 1]) / (1.0 - 2.0 * a_n * a_n);
            a[n - 1] = a_n;
            a[0] = -a_n;
            for i in 1..(n - 1) {
                a[i] = m[i] / phi.sqrt();
            }
        } else {
            let c_n1 = m[n - 2] / m_sum_sq.sqrt();
            let a_n1 = -3.582633 * u.powi(5) + 5.682633 * u.powi(4) - 1.752461 * u.powi(3)
                - 0.293762 * u.powi(2)
                + 0.042981 * u
                + c_n1;
            let phi = (m_sum_sq
                - 2.0 * m[n - 1] * m[n - 1]
                - 2.0 * m[n - 2] * m[n - 2])
                / (1.0 - 2.0 * a_n * a_n - 2.0 * a_n1 * a_n1);
            a[n - 1] = a_n;
            a[0] = -a_n;
            a[n - 2] = a_n1;
            a[1] = -a_n1;
            for i in 2..(n - 2) {
                a[i] = m[i] / phi.sqrt();
            }
        }
    }

    let xbar = mean(sorted);
    let denom: f64 = sorted.iter().map(|x| (x - xbar) * (x - xbar)).sum();
    if denom <= 0.0 {
        return None;
    }
    let num: f64 = a.iter().zip(sorted).map(|(w, x)| w * x).sum();
    let w = ((num * num) / denom).min(1.0 - 1e-10);

    let p = if n == 3 {
        let p = 6.0 / std::f64::consts::PI * (w.sqrt().asin() - 0.75f64.sqrt().asin());
        p.clamp(0.0, 1.0)
    } else if n <= 11 {
        let g = -2.273 + 0.459 * nf;
        let mu = 0.5440 - 0.39978 * nf + 0.025054 * nf * nf - 0.0006714 * nf * nf * nf;
        let sigma = (1.3822 - 0.77857 * nf + 0.062767 * nf * nf - 0.0020322 * nf * nf * nf).exp();
        let arg = g - (1.0 - w).ln();
        if arg <= 0.0 {
            return None;
        }
        let z = (-arg.ln() - mu) / sigma;
        norm_sf(z)
    } else {
        let ln_n = nf.ln();
        let mu = -1.5861 - 0.31082 * ln_n - 0.083751 * ln_n * ln_n + 0.0038915 * ln_n.powi(3);
        let sigma = (-0.4803 - 0.082676 * ln_n + 0.0030302 * ln_n * ln_n).exp();
        let z = ((1.0 - w).ln() - mu) / sigma;
        norm_sf(z)
    };

    if !p.is_finite() {
        return None;
    }
    Some(NormalityTest {
        statistic: w,
        p_value: p,
        is_normal: p > SIGNIFICANCE_LEVEL,
    })
}

/// Jarque-Bera: chi-square goodness-of-fit on the sample moments.
fn jarque_bera(values: &[f64]) -> Option<NormalityTest> {
    let n = values.len() as f64;
    let (skew, kurt) = population_moments(values)?;
    let jb = n / 6.0 * (skew * skew + (kurt - 3.0) * (kurt - 3.0) / 4.0);
    let p = chi2_sf(jb, 2.0);
    Some(NormalityTest {
        statistic: jb,
        p_value: p,
        is_normal: p > SIGNIFICANCE_LEVEL,
    })
}

/// D'Agostino K² omnibus test combining the skew and kurtosis z-scores.
fn dagostino(values: &[f64]) -> Option<NormalityTest> {
    if values.len() < DAGOSTINO_MIN_N {
        return None;
    }
    let z_s = skew_test_z(values)?;
    let z_k = kurtosis_test_z(values)?;
    let k2 = z_s * z_s + z_k * z_k;
    let p = chi2_sf(k2, 2.0);
    Some(NormalityTest {
        statistic: k2,
        p_value: p,
        is_normal: p > SIGNIFICANCE_LEVEL,
    })
}

/// D'Agostino (1970) transformed skewness z-score.
fn skew_test_z(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    let (b1, _) = population_moments(values)?;

    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    if w2 <= 1.0 {
        return None;
    }
    let delta = 1.0 / w2.sqrt().ln().sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    let ratio = y / alpha;
    Some(delta * (ratio + (ratio * ratio + 1.0).sqrt()).ln())
}

/// Anscombe-Glynn (1983) transformed kurtosis z-score.
fn kurtosis_test_z(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    let (_, b2) = population_moments(values)?;

    let e = 3.0 * (n - 1.0) / (n + 1.0);
    let var = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    if var <= 0.0 {
        return None;
    }
    let x = (b2 - e) / var.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());

    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return None;
    }
    let term2 = ((1.0 - 2.0 / a) / denom).cbrt();
    let z = (term1 - term2) / (2.0 / (9.0 * a)).sqrt();
    if z.is_finite() {
        Some(z)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Distribution fitting
// ---------------------------------------------------------------------------

/// Fit the candidate family by moments, score each with a KS test, and pick
/// the passing candidate with the highest p-value. Candidates whose
/// parameters cannot be estimated are skipped.
fn fit_candidates(sorted: &[f64]) -> FitReport {
    let mut candidates: BTreeMap<String, DistributionFit> = BTreeMap::new();

    for (name, fit) in [
        ("norm", fit_normal(sorted)),
        ("lognorm", fit_lognormal(sorted)),
        ("gamma", fit_gamma(sorted)),
        ("beta", fit_beta(sorted)),
        ("uniform", fit_uniform(sorted)),
    ] {
        if let Some(fit) = fit {
            candidates.insert(name.to_string(), fit);
        }
    }

    let best_fit = candidates
        .iter()
        .filter(|(_, f)| f.good_fit)
        .max_by(|(_, a), (_, b)| a.ks_p_value.total_cmp(&b.ks_p_value))
        .map(|(name, _)| name.clone());

    FitReport {
        candidates,
        best_fit,
    }
}

fn score_fit(sorted: &[f64], parameters: Vec<f64>, cdf: impl Fn(f64) -> f64) -> Option<DistributionFit> {
    let n = sorted.len();
    let mut d = 0.0f64;
    for (i, &x) in sorted.iter().enumerate() {
        let f = cdf(x);
        if !f.is_finite() {
            return None;
        }
        let d_plus = (i + 1) as f64 / n as f64 - f;
        let d_minus = f - i as f64 / n as f64;
        d = d.max(d_plus).max(d_minus);
    }
    let p = ks_p_value(n, d);
    Some(DistributionFit {
        parameters,
        ks_statistic: d,
        ks_p_value: p,
        good_fit: p > SIGNIFICANCE_LEVEL,
    })
}

fn fit_normal(sorted: &[f64]) -> Option<DistributionFit> {
    let mu = mean(sorted);
    let sigma = population_std(sorted);
    if sigma <= 0.0 {
        return None;
    }
    score_fit(sorted, vec![mu, sigma], move |x| norm_cdf((x - mu) / sigma))
}

fn fit_lognormal(sorted: &[f64]) -> Option<DistributionFit> {
    if sorted[0] <= 0.0 {
        return None;
    }
    let logs: Vec<f64> = sorted.iter().map(|x| x.ln()).collect();
    let mu = mean(&logs);
    let s = population_std(&logs);
    if s <= 0.0 {
        return None;
    }
    score_fit(sorted, vec![s, mu.exp()], move |x| {
        norm_cdf((x.ln() - mu) / s)
    })
}

fn fit_gamma(sorted: &[f64]) -> Option<DistributionFit> {
    if sorted[0] <= 0.0 {
        return None;
    }
    let m = mean(sorted);
    let var = {
        let v: f64 = sorted.iter().map(|x| (x - m) * (x - m)).sum();
        v / sorted.len() as f64
    };
    if var <= 0.0 {
        return None;
    }
    let shape = m * m / var;
    let scale = var / m;
    score_fit(sorted, vec![shape, scale], move |x| gamma_p(shape, x / scale))
}

fn fit_beta(sorted: &[f64]) -> Option<DistributionFit> {
    let lo = sorted[0];
    let range = sorted[sorted.len() - 1] - lo;
    if range <= 0.0 {
        return None;
    }
    let scaled: Vec<f64> = sorted.iter().map(|x| (x - lo) / range).collect();
    let m = mean(&scaled);
    let var = {
        let v: f64 = scaled.iter().map(|x| (x - m) * (x - m)).sum();
        v / scaled.len() as f64
    };
    if var <= 0.0 {
        return None;
    }
    let common = m * (1.0 - m) / var - 1.0;
    let alpha = m * common;
    let beta = (1.0 - m) * common;
    if alpha <= 0.0 || beta <= 0.0 {
        return None;
    }
    score_fit(sorted, vec![alpha, beta, lo, range], move |x| {
        beta_inc(alpha, beta, ((x - lo) / range).clamp(0.0, 1.0))
    })
}

fn fit_uniform(sorted: &[f64]) -> Option<DistributionFit> {
    let lo = sorted[0];
    let range = sorted[sorted.len() - 1] - lo;
    if range <= 0.0 {
        return None;
    }
    score_fit(sorted, vec![lo, range], move |x| {
        ((x - lo) / range).clamp(0.0, 1.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-normal sample via the quantile function.
    fn normal_sample(n: usize, mu: f64, sigma: f64) -> Vec<f64> {
        (1..=n)
            .map(|i| mu + sigma * norm_ppf(i as f64 / (n as f64 + 1.0)))
            .collect()
    }

    #[test]
    fn too_few_points_is_insufficient() {
        assert!(analyze(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn normal_looking_data_passes_the_panel() {
        let data = normal_sample(50, 100.0, 10.0);
        let report = analyze(&data).unwrap();
        assert!(report.normality_tests.contains_key("shapiro_wilk"));
        assert!(report.normality_tests.contains_key("jarque_bera"));
        assert!(report.normality_tests.contains_key("dagostino"));
        assert_eq!(report.is_likely_normal, Some(true));
        let shape = report.shape_analysis.unwrap();
        assert_eq!(shape.skewness_interpretation, "approximately_symmetric");
    }

    #[test]
    fn heavily_skewed_data_is_flagged() {
        // exponential-ish tail
        let data: Vec<f64> = (1..=60).map(|i| (i as f64 / 8.0).exp()).collect();
        let report = analyze(&data).unwrap();
        let shape = report.shape_analysis.unwrap();
        assert!(shape.skewness > 1.0);
        assert_eq!(shape.skewness_interpretation, "highly_right_skewed");
        let sw = &report.normality_tests["shapiro_wilk"];
        assert!(!sw.is_normal, "p={}", sw.p_value);
    }

    #[test]
    fn small_samples_skip_dagostino_but_still_report() {
        let data = [10.0, 12.0, 11.0, 13.0, 9.0];
        let report = analyze(&data).unwrap();
        assert!(!report.normality_tests.contains_key("dagostino"));
        assert!(report.normality_tests.contains_key("shapiro_wilk"));
        // below the fitting minimum
        assert!(report.distribution_fit.is_none());
    }

    #[test]
    fn constant_data_degrades_gracefully() {
        let data = [5.0; 10];
        let report = analyze(&data).unwrap();
        assert!(report.normality_tests.is_empty());
        assert!(report.is_likely_normal.is_none());
        assert!(report.shape_analysis.is_none());
    }

    #[test]
    fn uniform_data_prefers_the_uniform_fit() {
        let data: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        let report = analyze(&data).unwrap();
        let fit = report.distribution_fit.unwrap();
        let uniform = &fit.candidates["uniform"];
        assert!(uniform.good_fit, "p={}", uniform.ks_p_value);
        assert_eq!(fit.best_fit.as_deref(), Some("uniform"));
    }

    #[test]
    fn normal_fit_recovers_parameters() {
        let data = normal_sample(80, 50.0, 5.0);
        let report = analyze(&data).unwrap();
        let fit = report.distribution_fit.unwrap();
        let norm = &fit.candidates["norm"];
        assert!((norm.parameters[0] - 50.0).abs() < 1.0);
        assert!(norm.good_fit);
    }
}
