use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// The closed set of marketplaces the collectors know how to talk to.
/// `ProductRecord.platform` stays a free string so analysis also accepts
/// records from sources outside this set (history imports, JSON loads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Ebay,
    Jd,
    Taobao,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::Amazon, Platform::Ebay, Platform::Jd, Platform::Taobao];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "amazon" => Some(Platform::Amazon),
            "ebay" => Some(Platform::Ebay),
            "jd" | "jingdong" => Some(Platform::Jd),
            "taobao" => Some(Platform::Taobao),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Platform::Amazon => "amazon",
            Platform::Ebay => "ebay",
            Platform::Jd => "jd",
            Platform::Taobao => "taobao",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// ProductRecord
// ---------------------------------------------------------------------------

/// One observed listing at one point in time. `(platform, product_id)`
/// identifies a snapshot series; a new price observation is a new record,
/// never an update to an old one. `price == 0.0` means unknown/unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub platform: String,
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub availability: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ProductRecord {
    pub fn new(
        platform: impl Into<String>,
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
        availability: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            product_id: product_id.into(),
            name: name.into(),
            price,
            currency: currency.into(),
            availability: availability.into(),
            url: url.into(),
            image_url: None,
            rating: None,
            review_count: None,
            seller: None,
            category: None,
            brand: None,
            description: None,
            timestamp: Utc::now(),
        }
    }

    /// A price of zero means the collector could not read one.
    pub fn has_valid_price(&self) -> bool {
        self.price > 0.0
    }

    /// Required fields present and price non-negative.
    pub fn is_valid(&self) -> bool {
        !self.platform.is_empty()
            && !self.product_id.is_empty()
            && !self.name.is_empty()
            && !self.currency.is_empty()
            && !self.url.is_empty()
            && self.price >= 0.0
    }
}

// ---------------------------------------------------------------------------
// Match groups
// ---------------------------------------------------------------------------

/// Price spread over the members of a match group that carry a usable price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSpread {
    pub min_price: f64,
    pub max_price: f64,
    pub price_difference: f64,
    pub price_difference_percent: f64,
    pub cheapest_platform: String,
    pub most_expensive_platform: String,
}

/// Rating spread over the members of a match group that carry a rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSpread {
    pub min_rating: f64,
    pub max_rating: f64,
    pub avg_rating: f64,
    pub rating_range: f64,
    pub highest_rated_platform: String,
}

/// A cluster of records from at least two platforms judged to reference the
/// same underlying product. Built per analysis run; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MatchGroup {
    /// Name of the first member, kept for display.
    pub product_name: String,
    /// Platforms in member order (may repeat).
    pub platforms: Vec<String>,
    pub platform_count: usize,
    pub members: Vec<ProductRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_spread: Option<PriceSpread>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_spread: Option<RatingSpread>,
}

// ---------------------------------------------------------------------------
// Analysis results
// ---------------------------------------------------------------------------

/// Outlier detection method for the statistical engine. Methods are
/// mutually exclusive — one per analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Iqr,
    Zscore,
    ModifiedZscore,
}

impl OutlierMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "iqr" => Some(OutlierMethod::Iqr),
            "zscore" | "z_score" => Some(OutlierMethod::Zscore),
            "modified_zscore" | "modified-zscore" => Some(OutlierMethod::ModifiedZscore),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Zscore => "zscore",
            OutlierMethod::ModifiedZscore => "modified_zscore",
        };
        write!(f, "{s}")
    }
}

/// Container handed to exporters and renderers. `data` holds only nested
/// maps/lists/scalars so any consumer can walk it generically.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub analysis_type: String,
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl AnalysisResult {
    pub fn new(
        analysis_type: impl Into<String>,
        data: Map<String, Value>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            analysis_type: analysis_type.into(),
            data,
            timestamp: Utc::now(),
            metadata,
        }
    }

    /// Lossless JSON rendering; the timestamp becomes an ISO-8601 string.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("analysis_type".into(), Value::String(self.analysis_type.clone()));
        map.insert("data".into(), Value::Object(self.data.clone()));
        map.insert("timestamp".into(), Value::String(self.timestamp.to_rfc3339()));
        map.insert("metadata".into(), Value::Object(self.metadata.clone()));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parse_accepts_aliases() {
        assert_eq!(Platform::parse("JD"), Some(Platform::Jd));
        assert_eq!(Platform::parse("jingdong"), Some(Platform::Jd));
        assert_eq!(Platform::parse("bestbuy"), None);
    }

    #[test]
    fn record_validity() {
        let r = ProductRecord::new("amazon", "B01", "Widget", 9.99, "USD", "In Stock", "https://a/b");
        assert!(r.is_valid());
        assert!(r.has_valid_price());

        let mut zero = r.clone();
        zero.price = 0.0;
        assert!(zero.is_valid());
        assert!(!zero.has_valid_price());
    }

    #[test]
    fn analysis_result_serializes_timestamp_as_iso8601() {
        let result = AnalysisResult::new("t", Map::new(), Map::new());
        let v = result.to_value();
        let ts = v["timestamp"].as_str().unwrap();
        assert!(ts.contains('T'), "expected ISO-8601 timestamp, got {ts}");
    }
}
