//! Taobao (淘宝) search collector. Search pages embed listing data in a
//! `g_page_config` JavaScript object; the collector extracts that JSON and
//! reads the auction list, falling back to HTML containers when absent.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info};

use crate::collectors::{parse_selector, Collector, HttpFetcher};
use crate::error::Result;
use crate::types::{Platform, ProductRecord};
use crate::util::extract_numeric;

const SEARCH_URL: &str = "https://s.taobao.com/search";
const ITEM_URL: &str = "https://item.taobao.com/item.htm";

static PAGE_CONFIG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)g_page_config\s*=\s*(\{.+?\});").unwrap());

pub struct TaobaoCollector {
    fetcher: HttpFetcher,
    container: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
}

impl TaobaoCollector {
    pub fn new(request_delay_ms: u64) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(Platform::Taobao, request_delay_ms)?,
            container: parse_selector("div.item")?,
            title: parse_selector(".title a, .row-2 a")?,
            price: parse_selector(".price strong, .price")?,
            link: parse_selector("a")?,
        })
    }

    /// Pull the embedded `g_page_config` JSON out of a search page.
    fn extract_page_config(html: &str) -> Option<Value> {
        let captures = PAGE_CONFIG_RE.captures(html)?;
        serde_json::from_str(captures.get(1)?.as_str()).ok()
    }

    /// Records from the JSON auction list (`mods.itemlist.data.auctions`).
    fn parse_auctions(config: &Value, remaining: usize) -> Vec<ProductRecord> {
        let Some(mods) = config.get("mods").and_then(Value::as_object) else {
            return Vec::new();
        };
        let mut records = Vec::new();
        for module in mods.values() {
            let Some(auctions) = module
                .get("data")
                .and_then(|d| d.get("auctions"))
                .and_then(Value::as_array)
            else {
                continue;
            };
            for auction in auctions {
                if records.len() >= remaining {
                    return records;
                }
                if let Some(record) = Self::parse_auction(auction) {
                    records.push(record);
                }
            }
        }
        records
    }

    fn parse_auction(auction: &Value) -> Option<ProductRecord> {
        let nid = auction.get("nid").and_then(Value::as_str)?.to_string();
        let name = auction
            .get("raw_title")
            .or_else(|| auction.get("title"))
            .and_then(Value::as_str)?
            .to_string();
        let price = auction
            .get("view_price")
            .and_then(Value::as_str)
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(0.0);
        let url = auction
            .get("detail_url")
            .and_then(Value::as_str)
            .map(absolutize)
            .unwrap_or_else(|| format!("{ITEM_URL}?id={nid}"));

        let mut record = ProductRecord::new(
            "taobao",
            nid,
            name,
            price,
            "CNY",
            if price > 0.0 { "有货" } else { "未知" },
            url,
        );
        record.seller = auction
            .get("nick")
            .and_then(Value::as_str)
            .map(str::to_string);
        record.image_url = auction
            .get("pic_url")
            .and_then(Value::as_str)
            .map(absolutize);
        record.review_count = auction
            .get("comment_count")
            .and_then(Value::as_str)
            .and_then(|c| c.parse::<u64>().ok());
        Some(record)
    }

    /// HTML fallback for page variants without the embedded JSON.
    fn parse_search_html(&self, html: &str, remaining: usize) -> Vec<ProductRecord> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        for container in document.select(&self.container) {
            if records.len() >= remaining {
                break;
            }
            let Some(name) = container
                .select(&self.title)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .filter(|n| !n.is_empty())
            else {
                continue;
            };
            let Some(url) = container
                .select(&self.link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(absolutize)
            else {
                continue;
            };
            let Some(id) = self.extract_product_id(&url) else {
                continue;
            };
            let price = container
                .select(&self.price)
                .next()
                .and_then(|p| extract_numeric(&p.text().collect::<String>()))
                .unwrap_or(0.0);
            records.push(ProductRecord::new(
                "taobao",
                id,
                name,
                price,
                "CNY",
                if price > 0.0 { "有货" } else { "未知" },
                url,
            ));
        }
        records
    }

    fn parse_search_page(&self, html: &str, remaining: usize) -> Vec<ProductRecord> {
        if let Some(config) = Self::extract_page_config(html) {
            let records = Self::parse_auctions(&config, remaining);
            if !records.is_empty() {
                return records;
            }
        }
        self.parse_search_html(html, remaining)
    }
}

#[async_trait]
impl Collector for TaobaoCollector {
    fn platform(&self) -> Platform {
        Platform::Taobao
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ProductRecord>> {
        let mut products = Vec::new();
        let mut page = 0u32;

        while products.len() < max_results {
            // Taobao paginates with a 44-row offset
            let url = format!(
                "{SEARCH_URL}?q={}&s={}&ie=utf8",
                query.replace(' ', "+"),
                page * 44
            );
            let html = self.fetcher.get_text(&url).await?;
            let batch = self.parse_search_page(&html, max_results - products.len());
            if batch.is_empty() {
                debug!(page, "no more taobao results");
                break;
            }
            products.extend(batch);
            page += 1;
        }

        info!(count = products.len(), query, "taobao search complete");
        Ok(products)
    }

    async fn product_details(&self, url: &str) -> Result<Option<ProductRecord>> {
        let Some(id) = self.extract_product_id(url) else {
            return Ok(None);
        };
        let html = self.fetcher.get_text(url).await?;
        let document = Html::parse_document(&html);

        let title_sel = parse_selector("h1, .tb-main-title")?;
        let price_sel = parse_selector(".tb-rmb-num, #J_StrPrice .tb-rmb-num")?;

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
            "taobao",
            id,
            name,
            price,
            "CNY",
            if price > 0.0 { "有货" } else { "未知" },
            url,
        )))
    }

    /// Item id from the `id=` query parameter.
    fn extract_product_id(&self, url: &str) -> Option<String> {
        let query = url.split('?').nth(1)?;
        for pair in query.split('&') {
            if let Some(id) = pair.strip_prefix("id=") {
                if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
                    return Some(id.to_string());
                }
            }
        }
        None
    }
}

fn absolutize(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        href.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_extraction() {
        let collector = TaobaoCollector::new(0).unwrap();
        assert_eq!(
            collector.extract_product_id("https://item.taobao.com/item.htm?spm=a21&id=6677889900"),
            Some("6677889900".to_string())
        );
        assert_eq!(collector.extract_product_id("https://s.taobao.com/search?q=x"), None);
    }

    #[test]
    fn embedded_json_parsing() {
        let html = r#"<script>g_page_config = {"mods":{"itemlist":{"data":{"auctions":[
            {"nid":"6677889900","raw_title":"小米蓝牙耳机 正品","view_price":"99.00",
             "detail_url":"//item.taobao.com/item.htm?id=6677889900","nick":"小米旗舰店",
             "comment_count":"2048"}
        ]}}}};</script>"#;
        let collector = TaobaoCollector::new(0).unwrap();
        let records = collector.parse_search_page(html, 10);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.product_id, "6677889900");
        assert_eq!(r.price, 99.0);
        assert_eq!(r.seller.as_deref(), Some("小米旗舰店"));
        assert_eq!(r.review_count, Some(2048));
        assert!(r.url.starts_with("https://item.taobao.com"));
    }

    #[test]
    fn missing_json_falls_back_to_html() {
        let html = r#"
        <div class="item">
          <div class="title"><a href="//item.taobao.com/item.htm?id=123456">保温杯 不锈钢</a></div>
          <div class="price"><strong>59.90</strong></div>
        </div>"#;
        let collector = TaobaoCollector::new(0).unwrap();
        let records = collector.parse_search_page(html, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_id, "123456");
        assert_eq!(records[0].price, 59.9);
    }
}
