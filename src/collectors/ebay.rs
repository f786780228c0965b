//! eBay search-result collector.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::collectors::{parse_selector, Collector, HttpFetcher};
use crate::error::Result;
use crate::types::{Platform, ProductRecord};
use crate::util::extract_numeric;

const SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";

pub struct EbayCollector {
    fetcher: HttpFetcher,
    container: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
    image: Selector,
    condition: Selector,
    seller: Selector,
    promoted: Selector,
}

impl EbayCollector {
    pub fn new(request_delay_ms: u64) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(Platform::Ebay, request_delay_ms)?,
            container: parse_selector("div.s-item__wrapper, li.s-item")?,
            title: parse_selector(".s-item__title")?,
            price: parse_selector(".s-item__price")?,
            link: parse_selector("a.s-item__link")?,
            image: parse_selector(".s-item__image img")?,
            condition: parse_selector(".SECONDARY_INFO")?,
            seller: parse_selector(".s-item__seller-info-text")?,
            promoted: parse_selector(".s-item--promoted")?,
        })
    }

    fn extract_record(&self, container: scraper::ElementRef<'_>) -> Option<ProductRecord> {
        // promoted slots duplicate organic results
        if container.select(&self.promoted).next().is_some() {
            return None;
        }

        let name = container
            .select(&self.title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|n| !n.is_empty() && n != "Shop on eBay")?;

        let url = container
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)?;
        let product_id = self.extract_product_id(&url)?;

        // "$10.99 to $12.99" — take the low end
        let price = container
            .select(&self.price)
            .next()
            .and_then(|p| extract_numeric(&p.text().collect::<String>()))
            .unwrap_or(0.0);

        let availability = container
            .select(&self.condition)
            .next()
            .map(|c| c.text().collect::<String>().trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Available".to_string());

        let mut record =
            ProductRecord::new("ebay", product_id, name, price, "USD", availability, url);
        record.image_url = container
            .select(&self.image)
            .next()
            .and_then(|i| i.value().attr("src"))
            .map(str::to_string);
        record.seller = container
            .select(&self.seller)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string());
        Some(record)
    }

    fn parse_search_page(&self, html: &str, remaining: usize) -> Vec<ProductRecord> {
        let document = Html::parse_document(html);
        document
            .select(&self.container)
            .filter_map(|c| self.extract_record(c))
            .take(remaining)
            .collect()
    }
}

#[async_trait]
impl Collector for EbayCollector {
    fn platform(&self) -> Platform {
        Platform::Ebay
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ProductRecord>> {
        let mut products = Vec::new();
        let mut page = 1u32;

        while products.len() < max_results {
            let url = format!(
                "{SEARCH_URL}?_nkw={}&_pgn={page}",
                query.replace(' ', "+")
            );
            let html = self.fetcher.get_text(&url).await?;
            let batch = self.parse_search_page(&html, max_results - products.len());
            if batch.is_empty() {
                debug!(page, "no more ebay results");
                break;
            }
            products.extend(batch);
            page += 1;
        }

        info!(count = products.len(), query, "ebay search complete");
        Ok(products)
    }

    async fn product_details(&self, url: &str) -> Result<Option<ProductRecord>> {
        let Some(product_id) = self.extract_product_id(url) else {
            return Ok(None);
        };
        let html = self.fetcher.get_text(url).await?;
        let document = Html::parse_document(&html);

        let title_sel = parse_selector("h1.x-item-title__mainTitle span, h1#itemTitle")?;
        let price_sel = parse_selector(".x-price-primary span, #prcIsum")?;

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
            "ebay",
            product_id,
            name,
            price,
            "USD",
            "Available",
            url,
        )))
    }

    /// Item id from `/itm/<digits>` style URLs; some listing URLs carry a
    /// slug segment before the numeric id.
    fn extract_product_id(&self, url: &str) -> Option<String> {
        let start = url.find("/itm/")? + "/itm/".len();
        let path = url[start..].split(['?', '#']).next().unwrap_or("");
        path.rsplit('/')
            .find(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }
}
