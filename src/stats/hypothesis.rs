//! Hypothesis tests over the price column: a one-sample t-test of the mean
//! against the overall median, and — with two or more platforms — one-way
//! ANOVA plus pairwise two-sample t-tests between platform groups.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SIGNIFICANCE_LEVEL;
use crate::error::{ComputationWarning, Section};
use crate::stats::describe::{mean, median, sample_std, sample_variance};
use crate::stats::special::{f_sf, t_two_sided};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneSampleTest {
    pub test: String,
    pub null_hypothesis: String,
    pub t_statistic: f64,
    pub p_value: f64,
    pub reject_null: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisReport {
    pub mean_vs_median: OneSampleTest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTest {
    pub test: String,
    pub null_hypothesis: String,
    pub f_statistic: f64,
    pub p_value: f64,
    pub significant_difference: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseTest {
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant_difference: bool,
    pub mean_difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTestReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anova: Option<AnovaTest>,
    pub pairwise_tests: BTreeMap<String, PairwiseTest>,
}

/// One-sample t-test of "the mean equals the overall median".
pub fn one_sample(prices: &[f64]) -> Section<HypothesisReport> {
    if prices.is_empty() {
        return Err(ComputationWarning::new("hypothesis_tests", "no valid prices"));
    }
    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);
    let reference = median(&sorted);

    let n = prices.len();
    let sem = sample_std(prices) / (n as f64).sqrt();
    if sem == 0.0 {
        return Err(ComputationWarning::new(
            "hypothesis_tests",
            "degenerate variance, t statistic undefined",
        ));
    }

    let t = (mean(prices) - reference) / sem;
    let p = t_two_sided(t, (n - 1) as f64);

    Ok(HypothesisReport {
        mean_vs_median: OneSampleTest {
            test: "one_sample_t_test".to_string(),
            null_hypothesis: format!("mean equals {reference:.2}"),
            t_statistic: t,
            p_value: p,
            reject_null: p < SIGNIFICANCE_LEVEL,
        },
    })
}

/// Cross-platform tests over per-platform valid price groups. Groups with
/// no observations must already be excluded by the caller.
pub fn platform_tests(groups: &[(String, Vec<f64>)]) -> Section<PlatformTestReport> {
    if groups.len() < 2 {
        return Err(ComputationWarning::new(
            "platform_statistics",
            "at least two platforms with valid prices are required",
        ));
    }

    let anova = one_way_anova(groups);

    let mut pairwise = BTreeMap::new();
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let (name_a, a) = &groups[i];
            let (name_b, b) = &groups[j];
            if a.len() < 2 || b.len() < 2 {
                continue;
            }
            if let Some(test) = two_sample_t(a, b) {
                pairwise.insert(format!("{name_a}_vs_{name_b}"), test);
            }
        }
    }

    Ok(PlatformTestReport {
        anova,
        pairwise_tests: pairwise,
    })
}

/// One-way ANOVA. `None` when the within-group variance is degenerate and
/// the F statistic is undefined.
fn one_way_anova(groups: &[(String, Vec<f64>)]) -> Option<AnovaTest> {
    let k = groups.len();
    let total_n: usize = groups.iter().map(|(_, g)| g.len()).sum();
    if total_n <= k {
        return None;
    }

    let grand_sum: f64 = groups.iter().map(|(_, g)| g.iter().sum::<f64>()).sum();
    let grand_mean = grand_sum / total_n as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for (_, g) in groups {
        let gm = mean(g);
        ss_between += g.len() as f64 * (gm - grand_mean) * (gm - grand_mean);
        ss_within += g.iter().map(|x| (x - gm) * (x - gm)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (total_n - k) as f64;
    if ss_within <= 0.0 {
        return None;
    }

    let f = (ss_between / df_between) / (ss_within / df_within);
    let p = f_sf(f, df_between, df_within);

    Some(AnovaTest {
        test: "one_way_anova".to_string(),
        null_hypothesis: "all platform means are equal".to_string(),
        f_statistic: f,
        p_value: p,
        significant_difference: p < SIGNIFICANCE_LEVEL,
    })
}

/// Pooled two-sample t-test (equal variances assumed). `None` when the
/// pooled variance is degenerate.
fn two_sample_t(a: &[f64], b: &[f64]) -> Option<PairwiseTest> {
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let v1 = sample_variance(a);
    let v2 = sample_variance(b);

    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0);
    if pooled <= 0.0 {
        return None;
    }

    let mean_diff = mean(a) - mean(b);
    let t = mean_diff / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    let p = t_two_sided(t, n1 + n2 - 2.0);

    Some(PairwiseTest {
        t_statistic: t,
        p_value: p,
        significant_difference: p < SIGNIFICANCE_LEVEL,
        mean_difference: mean_diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_data_does_not_reject_mean_vs_median() {
        let prices = [100.0, 110.0, 120.0, 130.0, 140.0];
        let report = one_sample(&prices).unwrap();
        // mean == median, t is exactly zero
        assert_eq!(report.mean_vs_median.t_statistic, 0.0);
        assert!(!report.mean_vs_median.reject_null);
    }

    #[test]
    fn constant_prices_degrade_instead_of_dividing_by_zero() {
        assert!(one_sample(&[50.0, 50.0, 50.0]).is_err());
    }

    #[test]
    fn well_separated_platforms_are_significant() {
        let groups = vec![
            ("a".to_string(), vec![10.0, 11.0, 10.5, 9.5, 10.2]),
            ("b".to_string(), vec![50.0, 51.0, 50.5, 49.5, 50.2]),
        ];
        let report = platform_tests(&groups).unwrap();
        let anova = report.anova.unwrap();
        assert!(anova.significant_difference, "p={}", anova.p_value);

        let pair = &report.pairwise_tests["a_vs_b"];
        assert!(pair.significant_difference);
        assert!((pair.mean_difference + 40.0).abs() < 0.5);
    }

    #[test]
    fn overlapping_platforms_are_not_significant() {
        let groups = vec![
            ("a".to_string(), vec![10.0, 12.0, 11.0, 9.0, 13.0]),
            ("b".to_string(), vec![10.5, 11.5, 9.5, 12.5, 10.0]),
        ];
        let report = platform_tests(&groups).unwrap();
        let anova = report.anova.unwrap();
        assert!(!anova.significant_difference, "p={}", anova.p_value);
    }

    #[test]
    fn single_observation_platforms_are_skipped_pairwise() {
        let groups = vec![
            ("a".to_string(), vec![10.0]),
            ("b".to_string(), vec![50.0, 51.0]),
            ("c".to_string(), vec![30.0, 31.0]),
        ];
        let report = platform_tests(&groups).unwrap();
        assert!(report.pairwise_tests.contains_key("b_vs_c"));
        assert!(!report.pairwise_tests.keys().any(|k| k.contains("a_")));
    }
}
