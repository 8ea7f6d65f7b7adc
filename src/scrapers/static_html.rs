//! Static-HTML extractor: raw HTTP fetch, no script execution.
//!
//! The fallback when the browser extractor errors, times out, or the
//! automation runtime is unavailable. Applies the same selector-strategy
//! set against the parsed (non-executed) HTML tree.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::strategies;
use super::{ContentType, Extractor, ScrapedRecord};

/// Generic browser-like user agent for plain HTTP fetches.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTP-based extractor over `reqwest` + `scraper`.
pub struct StaticExtractor {
    client: Client,
    synthetic_fill: bool,
}

impl StaticExtractor {
    pub fn new(timeout: Duration, synthetic_fill: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            synthetic_fill,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?;
        response.text().await.context("Failed to read response body")
    }
}

/// Parse a document and run the strategy set for the content type.
/// Shared with the browser extractor, which hands in its rendered DOM.
pub fn extract_from_html(
    content: ContentType,
    body: &str,
    page_url: &Url,
    synthetic_fill: bool,
) -> Vec<ScrapedRecord> {
    let html = Html::parse_document(body);
    match content {
        ContentType::Categories => strategies::extract_categories(&html, page_url)
            .into_iter()
            .map(ScrapedRecord::Category)
            .collect(),
        ContentType::Products => strategies::extract_products(&html, page_url, synthetic_fill)
            .into_iter()
            .map(ScrapedRecord::Product)
            .collect(),
        ContentType::ProductDetail => strategies::extract_product_detail(&html, page_url, synthetic_fill)
            .map(ScrapedRecord::Product)
            .into_iter()
            .collect(),
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn extract(&mut self, content: ContentType, url: &str) -> Result<Vec<ScrapedRecord>> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
        let body = self.fetch(url).await?;
        let records = extract_from_html(content, &body, &parsed, self.synthetic_fill);
        debug!(url, content = %content, count = records.len(), "static extraction finished");
        Ok(records)
    }
}
