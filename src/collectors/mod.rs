//! Marketplace collectors: a fixed closed set of adapters behind one
//! capability interface. Collectors are mechanical I/O — fetch, parse,
//! emit `ProductRecord`s — and the analysis core never depends on them,
//! only on the record stream they produce.

pub mod amazon;
pub mod ebay;
pub mod jd;
pub mod taobao;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, REQUEST_BACKOFF_MS};
use crate::error::{MonitorError, Result};
use crate::types::{Platform, ProductRecord};

pub use amazon::AmazonCollector;
pub use ebay::EbayCollector;
pub use jd::JdCollector;
pub use taobao::TaobaoCollector;

const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Shared capability interface for every marketplace adapter.
#[async_trait]
pub trait Collector: Send + Sync {
    fn platform(&self) -> Platform;

    /// Search the platform and return up to `max_results` records.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ProductRecord>>;

    /// Fetch one product page and extract a record, if the page parses.
    async fn product_details(&self, url: &str) -> Result<Option<ProductRecord>>;

    /// Extract the platform-scoped product id from a listing URL.
    fn extract_product_id(&self, url: &str) -> Option<String>;
}

/// Build the adapter for one platform of the closed set.
pub fn collector_for(platform: Platform, request_delay_ms: u64) -> Result<Box<dyn Collector>> {
    Ok(match platform {
        Platform::Amazon => Box::new(AmazonCollector::new(request_delay_ms)?),
        Platform::Ebay => Box::new(EbayCollector::new(request_delay_ms)?),
        Platform::Jd => Box::new(JdCollector::new(request_delay_ms)?),
        Platform::Taobao => Box::new(TaobaoCollector::new(request_delay_ms)?),
    })
}

/// Minimum-delay gate between requests to one platform.
pub struct RateGate {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_delay_ms: u64) -> Self {
        Self {
            min_delay: Duration::from_millis(min_delay_ms),
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                let pause = self.min_delay - elapsed;
                debug!(pause_ms = pause.as_millis() as u64, "rate limiting request");
                tokio::time::sleep(pause).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Shared HTTP plumbing for the adapters: client construction and a
/// rate-limited GET with exponential backoff. HTTP 429 surfaces as a
/// rate-limit error immediately.
pub struct HttpFetcher {
    client: reqwest::Client,
    gate: RateGate,
    platform: Platform,
}

impl HttpFetcher {
    pub fn new(platform: Platform, request_delay_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            gate: RateGate::new(request_delay_ms),
            platform,
        })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.gate.wait().await;

        let mut last_error: Option<MonitorError> = None;
        for (attempt, backoff_ms) in REQUEST_BACKOFF_MS.iter().enumerate() {
            match self.client.get(url).send().await {
                Ok(response) => {
                    if response.status().as_u16() == 429 {
                        return Err(MonitorError::RateLimited(self.platform.to_string()));
                    }
                    match response.error_for_status() {
                        Ok(ok) => return Ok(ok.text().await?),
                        Err(e) => last_error = Some(e.into()),
                    }
                }
                Err(e) => last_error = Some(e.into()),
            }
            if attempt + 1 < REQUEST_BACKOFF_MS.len() {
                debug!(
                    platform = %self.platform,
                    attempt = attempt + 1,
                    backoff_ms,
                    "request failed, backing off"
                );
                tokio::time::sleep(Duration::from_millis(*backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            MonitorError::Collector(format!("request to {url} failed with no response"))
        }))
    }
}

/// Run every configured platform concurrently and merge the streams.
/// A failed platform is logged and skipped — partial results are fine.
/// Records are deduplicated on (platform, product_id).
pub async fn collect_all(cfg: &Config) -> Vec<ProductRecord> {
    let seen: Arc<DashSet<String>> = Arc::new(DashSet::new());
    let mut handles = Vec::new();

    for &platform in &cfg.platforms {
        let query = cfg.search_query.clone();
        let max_results = cfg.max_results;
        let delay = cfg.request_delay_ms;
        let seen = Arc::clone(&seen);
        handles.push(tokio::spawn(async move {
            let collector = collector_for(platform, delay)?;
            let records = collector.search(&query, max_results).await?;
            let kept: Vec<ProductRecord> = records
                .into_iter()
                .filter(|r| {
                    if !r.is_valid() {
                        debug!(platform = %platform, "dropping invalid record");
                        return false;
                    }
                    seen.insert(format!("{}:{}", r.platform, r.product_id))
                })
                .collect();
            Ok::<_, crate::error::MonitorError>(kept)
        }));
    }

    let mut merged = Vec::new();
    for (handle, &platform) in futures_util::future::join_all(handles)
        .await
        .into_iter()
        .zip(&cfg.platforms)
    {
        match handle {
            Ok(Ok(records)) => {
                info!(platform = %platform, records = records.len(), "collection complete");
                merged.extend(records);
            }
            Ok(Err(e)) => warn!(platform = %platform, "collection failed: {e}"),
            Err(e) => warn!(platform = %platform, "collector task panicked: {e}"),
        }
    }

    merged
}

/// Parse a CSS selector at adapter construction time.
pub(crate) fn parse_selector(selector: &str) -> Result<scraper::Selector> {
    scraper::Selector::parse(selector)
        .map_err(|e| MonitorError::Collector(format!("invalid selector {selector:?}: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_a_collector() {
        for platform in Platform::ALL {
            let collector = collector_for(platform, 0).unwrap();
            assert_eq!(collector.platform(), platform);
        }
    }

    #[tokio::test]
    async fn rate_gate_spaces_requests() {
        let gate = RateGate::new(50);
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
