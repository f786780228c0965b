//! JD.com (京东) search-result collector.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::collectors::{parse_selector, Collector, HttpFetcher};
use crate::error::Result;
use crate::types::{Platform, ProductRecord};
use crate::util::extract_numeric;

const SEARCH_URL: &str = "https://search.jd.com/Search";
const ITEM_URL: &str = "https://item.jd.com";

pub struct JdCollector {
    fetcher: HttpFetcher,
    container: Selector,
    sku_container: Selector,
    name: Selector,
    price: Selector,
    link: Selector,
    shop: Selector,
    image: Selector,
}

impl JdCollector {
    pub fn new(request_delay_ms: u64) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(Platform::Jd, request_delay_ms)?,
            container: parse_selector("div.gl-i-wrap")?,
            sku_container: parse_selector("li[data-sku]")?,
            name: parse_selector(".p-name em, .p-name a")?,
            price: parse_selector(".p-price i")?,
            link: parse_selector(".p-name a")?,
            shop: parse_selector(".p-shop a")?,
            image: parse_selector(".p-img img")?,
        })
    }

    fn extract_record(&self, container: scraper::ElementRef<'_>) -> Option<ProductRecord> {
        let name = container
            .select(&self.name)
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|n| !n.is_empty())?;

        let href = container
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        let sku = container
            .value()
            .attr("data-sku")
            .map(str::to_string)
            .or_else(|| href.as_deref().and_then(|h| self.extract_product_id(h)))?;

        let url = href
            .map(|h| absolutize(&h))
            .unwrap_or_else(|| format!("{ITEM_URL}/{sku}.html"));

        let price = container
            .select(&self.price)
            .next()
            .and_then(|p| extract_numeric(&p.text().collect::<String>()))
            .unwrap_or(0.0);

        let mut record = ProductRecord::new(
            "jd",
            sku,
            name,
            price,
            "CNY",
            if price > 0.0 { "有货" } else { "未知" },
            url,
        );
        record.seller = container
            .select(&self.shop)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());
        record.image_url = container
            .select(&self.image)
            .next()
            .and_then(|i| i.value().attr("src").or(i.value().attr("data-lazy-img")))
            .map(|src| absolutize(src));
        Some(record)
    }

    fn parse_search_page(&self, html: &str, remaining: usize) -> Vec<ProductRecord> {
        let document = Html::parse_document(html);
        let mut records: Vec<ProductRecord> = document
            .select(&self.container)
            .filter_map(|c| self.extract_record(c))
            .take(remaining)
            .collect();
        if records.is_empty() {
            // layout variant keyed by the sku attribute
            records = document
                .select(&self.sku_container)
                .filter_map(|c| self.extract_record(c))
                .take(remaining)
                .collect();
        }
        records
    }
}

#[async_trait]
impl Collector for JdCollector {
    fn platform(&self) -> Platform {
        Platform::Jd
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ProductRecord>> {
        let mut products = Vec::new();
        let mut page = 1u32;

        while products.len() < max_results {
            // JD paginates on odd page numbers with an `s` row offset
            let url = format!(
                "{SEARCH_URL}?keyword={}&enc=utf-8&page={}&s={}",
                query.replace(' ', "+"),
                page * 2 - 1,
                (page - 1) * 30 + 1
            );
            let html = self.fetcher.get_text(&url).await?;
            let batch = self.parse_search_page(&html, max_results - products.len());
            if batch.is_empty() {
                debug!(page, "no more jd results");
                break;
            }
            products.extend(batch);
            page += 1;
        }

        info!(count = products.len(), query, "jd search complete");
        Ok(products)
    }

    async fn product_details(&self, url: &str) -> Result<Option<ProductRecord>> {
        let Some(sku) = self.extract_product_id(url) else {
            return Ok(None);
        };
        let html = self.fetcher.get_text(url).await?;
        let document = Html::parse_document(&html);

        let title_sel = parse_selector(".sku-name, .itemInfo-wrap .sku-name")?;
        let price_sel = parse_selector(".p-price .price, .summary-price .price")?;

        let Some(name) = document
            .select(&title_sel)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|n| !n.is_empty())
        else {
            return Ok(None);
        };
        let price = document
            .select(&price_sel)
            .next()
            .and_then(|p| extract_numeric(&p.text().collect::<String>()))
            .unwrap_or(0.0);

        Ok(Some(ProductRecord::new(
            "jd",
            sku,
            name,
            price,
            "CNY",
            if price > 0.0 { "有货" } else { "未知" },
            url,
        )))
    }

    /// Sku from `item.jd.com/<digits>.html` URLs.
    fn extract_product_id(&self, url: &str) -> Option<String> {
        let file = url.split(['?', '#']).next()?.rsplit('/').next()?;
        let digits = file.strip_suffix(".html").unwrap_or(file);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            Some(digits.to_string())
        } else {
            None
        }
    }
}

fn absolutize(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{ITEM_URL}/{href}")
    }
}
