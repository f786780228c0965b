//! Statistical engine for the price column. Each section is computed
//! independently and degrades to a `ComputationWarning` on malformed or
//! insufficient input — a failure in one section never takes down another.

pub mod correlation;
pub mod describe;
pub mod distribution;
pub mod hypothesis;
pub mod intervals;
pub mod outliers;
pub mod special;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{
    BOOTSTRAP_RESAMPLES, DEFAULT_CONFIDENCE_LEVEL, MODIFIED_ZSCORE_THRESHOLD, ZSCORE_THRESHOLD,
};
use crate::error::{ComputationWarning, MonitorError, Result, Section};
use crate::types::{AnalysisResult, OutlierMethod, ProductRecord};

pub use correlation::CorrelationReport;
pub use describe::StatisticalSummary;
pub use distribution::DistributionAnalysis;
pub use hypothesis::{HypothesisReport, PlatformTestReport};
pub use intervals::ConfidenceReport;
pub use outliers::OutlierReport;

/// Default seed for the bootstrap RNG; override for independent replicates.
pub const DEFAULT_BOOTSTRAP_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct StatsOptions {
    pub confidence_level: f64,
    pub outlier_method: OutlierMethod,
    pub zscore_threshold: f64,
    pub modified_zscore_threshold: f64,
    pub bootstrap_resamples: usize,
    pub bootstrap_seed: u64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            outlier_method: OutlierMethod::Iqr,
            zscore_threshold: ZSCORE_THRESHOLD,
            modified_zscore_threshold: MODIFIED_ZSCORE_THRESHOLD,
            bootstrap_resamples: BOOTSTRAP_RESAMPLES,
            bootstrap_seed: DEFAULT_BOOTSTRAP_SEED,
        }
    }
}

/// Every section outcome, preserved as `Section<T>` so callers and tests
/// can see exactly which parts degraded and why.
#[derive(Debug, Clone)]
pub struct StatisticalReport {
    pub descriptive: Section<StatisticalSummary>,
    pub distribution: Section<DistributionAnalysis>,
    pub outliers: Section<OutlierReport>,
    pub correlations: Section<CorrelationReport>,
    pub confidence_intervals: Section<ConfidenceReport>,
    pub hypothesis_tests: Section<HypothesisReport>,
    /// Present only when at least two platforms appear in the input.
    pub platform_statistics: Option<Section<PlatformTestReport>>,
}

impl StatisticalReport {
    /// Flatten into the exporter-facing data map. A degraded section
    /// becomes `{"note": <reason>}` under its usual key.
    pub fn into_data(self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("descriptive_stats".into(), section_value(self.descriptive));
        data.insert("distribution_analysis".into(), section_value(self.distribution));
        data.insert("outlier_analysis".into(), section_value(self.outliers));
        data.insert("correlation_analysis".into(), section_value(self.correlations));
        data.insert("confidence_intervals".into(), section_value(self.confidence_intervals));
        data.insert("hypothesis_tests".into(), section_value(self.hypothesis_tests));
        if let Some(platform) = self.platform_statistics {
            data.insert("platform_statistics".into(), section_value(platform));
        }
        data
    }
}

fn section_value<T: Serialize>(section: Section<T>) -> Value {
    match section {
        Ok(v) => serde_json::to_value(v).unwrap_or(Value::Null),
        Err(w) => {
            debug!(section = %w.section, reason = %w.reason, "statistical section degraded");
            let mut map = Map::new();
            map.insert("note".into(), Value::String(w.reason));
            Value::Object(map)
        }
    }
}

pub struct StatisticalAnalyzer {
    options: StatsOptions,
}

impl Default for StatisticalAnalyzer {
    fn default() -> Self {
        Self::new(StatsOptions::default())
    }
}

impl StatisticalAnalyzer {
    pub fn new(options: StatsOptions) -> Self {
        Self { options }
    }

    /// Full statistical analysis wrapped as an `AnalysisResult`.
    pub fn analyze(&self, records: &[ProductRecord]) -> Result<AnalysisResult> {
        if records.is_empty() {
            return Err(MonitorError::Validation(
                "empty record list provided for statistical analysis".to_string(),
            ));
        }

        let report = self.report(records);
        let mut metadata = Map::new();
        metadata.insert("sample_size".into(), Value::from(records.len()));
        metadata.insert(
            "confidence_level".into(),
            Value::from(self.options.confidence_level),
        );
        metadata.insert(
            "outlier_method".into(),
            Value::String(self.options.outlier_method.to_string()),
        );

        Ok(AnalysisResult::new(
            "statistical_analysis",
            report.into_data(),
            metadata,
        ))
    }

    /// Compute every section over the valid (strictly positive) prices.
    pub fn report(&self, records: &[ProductRecord]) -> StatisticalReport {
        let valid: Vec<&ProductRecord> =
            records.iter().filter(|r| r.has_valid_price()).collect();
        let prices: Vec<f64> = valid.iter().map(|r| r.price).collect();

        let descriptive = describe::summarize(&prices).ok_or_else(no_valid_prices);

        let distribution = if prices.is_empty() {
            Err(no_valid_prices())
        } else {
            distribution::analyze(&prices)
        };

        let outliers = if valid.is_empty() {
            Err(no_valid_prices())
        } else {
            Ok(outliers::detect(
                &valid,
                self.options.outlier_method,
                self.options.zscore_threshold,
                self.options.modified_zscore_threshold,
            ))
        };

        let confidence_intervals = intervals::confidence_intervals(
            &prices,
            self.options.confidence_level,
            self.options.bootstrap_resamples,
            self.options.bootstrap_seed,
        );

        let platform_groups = platform_price_groups(records);
        let platform_statistics = if platform_groups.len() >= 2 {
            Some(hypothesis::platform_tests(&platform_groups))
        } else {
            None
        };

        StatisticalReport {
            descriptive,
            distribution,
            outliers,
            correlations: correlation::analyze(records),
            confidence_intervals,
            hypothesis_tests: hypothesis::one_sample(&prices),
            platform_statistics,
        }
    }
}

fn no_valid_prices() -> ComputationWarning {
    ComputationWarning::new("statistics", "no valid prices in input")
}

/// Per-platform valid prices, platforms in first-appearance order;
/// platforms without a single valid price are excluded.
pub fn platform_price_groups(records: &[ProductRecord]) -> Vec<(String, Vec<f64>)> {
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for record in records {
        if !record.has_valid_price() {
            continue;
        }
        match groups.iter_mut().find(|(name, _)| *name == record.platform) {
            Some((_, prices)) => prices.push(record.price),
            None => groups.push((record.platform.clone(), vec![record.price])),
        }
    }
    groups
}
