//! Amazon search-result collector.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::collectors::{parse_selector, Collector, HttpFetcher};
use crate::error::Result;
use crate::types::{Platform, ProductRecord};
use crate::util::extract_numeric;

const BASE_URL: &str = "https://www.amazon.com";

pub struct AmazonCollector {
    fetcher: HttpFetcher,
    container: Selector,
    title: Selector,
    price: Selector,
    rating: Selector,
    reviews: Selector,
    link: Selector,
    image: Selector,
}

impl AmazonCollector {
    pub fn new(request_delay_ms: u64) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(Platform::Amazon, request_delay_ms)?,
            container: parse_selector(r#"div[data-component-type="s-search-result"]"#)?,
            title: parse_selector("h2 a span, h2 span")?,
            price: parse_selector(".a-price .a-offscreen")?,
            rating: parse_selector(".a-icon-alt")?,
            reviews: parse_selector("span.a-size-base.s-underline-text")?,
            link: parse_selector("h2 a, a.a-link-normal")?,
            image: parse_selector("img.s-image")?,
        })
    }

    fn extract_record(&self, container: scraper::ElementRef<'_>) -> Option<ProductRecord> {
        let product_id = container.value().attr("data-asin")?.to_string();
        if product_id.is_empty() {
            return None;
        }

        let name = container
            .select(&self.title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|n| !n.is_empty())?;

        let price = container
            .select(&self.price)
            .next()
            .and_then(|p| extract_numeric(&p.text().collect::<String>()))
            .unwrap_or(0.0);

        let url = container
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(absolutize)
            .unwrap_or_else(|| format!("{BASE_URL}/dp/{product_id}"));

        let mut record = ProductRecord::new(
            "amazon",
            product_id,
            name,
            price,
            "USD",
            if price > 0.0 { "In Stock" } else { "Unknown" },
            url,
        );
        record.rating = container
            .select(&self.rating)
            .next()
            .and_then(|r| extract_numeric(&r.text().collect::<String>()));
        record.review_count = container
            .select(&self.reviews)
            .next()
            .and_then(|r| extract_numeric(&r.text().collect::<String>()))
            .map(|c| c as u64);
        record.image_url = container
            .select(&self.image)
            .next()
            .and_then(|i| i.value().attr("src"))
            .map(str::to_string);
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
impl Collector for AmazonCollector {
    fn platform(&self) -> Platform {
        Platform::Amazon
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ProductRecord>> {
        let mut products = Vec::new();
        let mut page = 1u32;

        while products.len() < max_results {
            let url = format!(
                "{BASE_URL}/s?k={}&page={page}&ref=sr_pg_{page}",
                urlencode(query)
            );
            let html = self.fetcher.get_text(&url).await?;
            let batch = self.parse_search_page(&html, max_results - products.len());
            if batch.is_empty() {
                debug!(page, "no more amazon results");
                break;
            }
            products.extend(batch);
            page += 1;
        }

        info!(count = products.len(), query, "amazon search complete");
        Ok(products)
    }

    async fn product_details(&self, url: &str) -> Result<Option<ProductRecord>> {
        let Some(product_id) = self.extract_product_id(url) else {
            return Ok(None);
        };
        let html = self.fetcher.get_text(url).await?;
        let document = Html::parse_document(&html);

        let title_sel = parse_selector("#productTitle")?;
        let price_sel = parse_selector(".a-price .a-offscreen")?;

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
            "amazon",
            product_id,
            name,
            price,
            "USD",
            if price > 0.0 { "In Stock" } else { "Unknown" },
            url,
        )))
    }

    fn extract_product_id(&self, url: &str) -> Option<String> {
        for marker in ["/dp/", "/gp/product/"] {
            if let Some(start) = url.find(marker) {
                let rest = &url[start + marker.len()..];
                let id: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect();
                if !id.is_empty() {
                    return Some(id);
                }
            }
        }
        None
    }
}

fn absolutize(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{BASE_URL}{href}")
    }
}

fn urlencode(query: &str) -> String {
    query
        .chars()
        .map(|c| match c {
            ' ' => "+".to_string(),
            c if c.is_ascii_alphanumeric() || "-_.~".contains(c) => c.to_string(),
            c => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{b:02X}"))
                    .collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_extraction() {
        let collector = AmazonCollector::new(0).unwrap();
        assert_eq!(
            collector.extract_product_id("https://www.amazon.com/dp/B0ABC12345?ref=x"),
            Some("B0ABC12345".to_string())
        );
        assert_eq!(
            collector.extract_product_id("https://www.amazon.com/gp/product/B09XYZ"),
            Some("B09XYZ".to_string())
        );
        assert_eq!(collector.extract_product_id("https://www.amazon.com/s?k=x"), None);
    }

    #[test]
    fn search_page_parsing() {
        let html = r#"
        <html><body>
          <div data-component-type="s-search-result" data-asin="B0TEST1234">
            <h2><a href="/dp/B0TEST1234"><span>Acme Wireless Earbuds</span></a></h2>
            <span class="a-price"><span class="a-offscreen">$29.99</span></span>
            <span class="a-icon-alt">4.4 out of 5 stars</span>
            <span class="a-size-base s-underline-text">1,024</span>
            <img class="s-image" src="https://img.example/x.jpg"/>
          </div>
        </body></html>"#;
        let collector = AmazonCollector::new(0).unwrap();
        let records = collector.parse_search_page(html, 10);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.product_id, "B0TEST1234");
        assert_eq!(r.name, "Acme Wireless Earbuds");
        assert_eq!(r.price, 29.99);
        assert_eq!(r.rating, Some(4.4));
        assert_eq!(r.review_count, Some(1024));
        assert!(r.url.ends_with("/dp/B0TEST1234"));
    }

    #[test]
    fn query_encoding() {
        assert_eq!(urlencode("wireless earbuds"), "wireless+earbuds");
        assert_eq!(urlencode("蓝牙"), "%E8%93%9D%E7%89%99");
    }
}
