use crate::error::{MonitorError, Result};
use crate::types::{OutlierMethod, Platform};

/// Similarity score a pair of product names must reach before the matcher
/// places them in the same cross-platform group.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Default confidence level for mean/median interval estimation.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// p-value below which a statistical test rejects its null hypothesis.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// |z| above which a price is flagged by the z-score outlier method.
pub const ZSCORE_THRESHOLD: f64 = 3.0;

/// |modified z| above which a price is flagged by the modified z-score method.
pub const MODIFIED_ZSCORE_THRESHOLD: f64 = 3.5;

/// Scale constant relating the MAD of a normal sample to its standard
/// deviation (Φ⁻¹(0.75)).
pub const MAD_SCALE: f64 = 0.6745;

/// Resamples drawn for the bootstrap median confidence interval.
pub const BOOTSTRAP_RESAMPLES: usize = 1000;

/// IQR fence multiplier for outlier bounds.
pub const IQR_FENCE: f64 = 1.5;

/// Retry backoff values for collector HTTP requests, in milliseconds.
pub const REQUEST_BACKOFF_MS: &[u64] = &[500, 1_000, 2_000, 4_000];

/// Minimum delay between requests to the same platform (milliseconds).
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1_000;

/// Price-bracket widths keyed by the observed price span.
pub mod bracket_rule {
    pub const NARROW_SPAN: f64 = 50.0;
    pub const NARROW_WIDTH: f64 = 10.0;
    pub const MEDIUM_SPAN: f64 = 200.0;
    pub const MEDIUM_WIDTH: f64 = 25.0;
    pub const WIDE_SPAN: f64 = 1_000.0;
    pub const WIDE_WIDTH: f64 = 100.0;
    pub const DEFAULT_WIDTH: f64 = 250.0;
}

/// Bracket width for a given observed price span.
pub fn bracket_width(span: f64) -> f64 {
    use bracket_rule::*;
    if span < NARROW_SPAN {
        NARROW_WIDTH
    } else if span < MEDIUM_SPAN {
        MEDIUM_WIDTH
    } else if span < WIDE_SPAN {
        WIDE_WIDTH
    } else {
        DEFAULT_WIDTH
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub export_dir: String,
    /// Search query sent to every enabled platform (SEARCH_QUERY).
    pub search_query: String,
    /// Platforms to collect from (PLATFORMS, comma-separated).
    pub platforms: Vec<Platform>,
    /// Per-platform result cap (MAX_RESULTS).
    pub max_results: usize,
    /// Minimum delay between requests to one platform (REQUEST_DELAY_MS).
    pub request_delay_ms: u64,
    /// Matcher threshold (SIMILARITY_THRESHOLD).
    pub similarity_threshold: f64,
    /// Interval confidence level (CONFIDENCE_LEVEL).
    pub confidence_level: f64,
    /// Outlier detection method (OUTLIER_METHOD: iqr | zscore | modified_zscore).
    pub outlier_method: OutlierMethod,
    /// Skip collection and analyze the latest stored snapshot (OFFLINE=1).
    pub offline: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let platforms = std::env::var("PLATFORMS")
            .unwrap_or_else(|_| "amazon,ebay,jd,taobao".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Platform::parse(s)
                    .ok_or_else(|| MonitorError::Config(format!("unknown platform: {s}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let outlier_method = {
            let raw = std::env::var("OUTLIER_METHOD").unwrap_or_else(|_| "iqr".to_string());
            OutlierMethod::parse(&raw)
                .ok_or_else(|| MonitorError::Config(format!("unknown outlier method: {raw}")))?
        };

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "price_monitor.db".to_string()),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or_else(|_| "exports".to_string()),
            search_query: std::env::var("SEARCH_QUERY").unwrap_or_else(|_| "wireless earbuds".to_string()),
            platforms,
            max_results: std::env::var("MAX_RESULTS")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<usize>()
                .unwrap_or(20),
            request_delay_ms: std::env::var("REQUEST_DELAY_MS")
                .unwrap_or_else(|_| DEFAULT_REQUEST_DELAY_MS.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            similarity_threshold: std::env::var("SIMILARITY_THRESHOLD")
                .unwrap_or_else(|_| DEFAULT_SIMILARITY_THRESHOLD.to_string())
                .parse::<f64>()
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
            confidence_level: std::env::var("CONFIDENCE_LEVEL")
                .unwrap_or_else(|_| DEFAULT_CONFIDENCE_LEVEL.to_string())
                .parse::<f64>()
                .unwrap_or(DEFAULT_CONFIDENCE_LEVEL),
            outlier_method,
            offline: std::env::var("OFFLINE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}
