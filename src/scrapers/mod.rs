//! Catalog extraction pipeline.
//!
//! Two extractors (headless browser and raw HTTP) share one selector-strategy
//! set and produce the same record shapes, so the orchestrator and the
//! reconciler never care which one a record came from.

pub mod browser;
pub mod cache;
pub mod normalize;
pub mod orchestrator;
pub mod static_html;
pub mod strategies;

#[cfg(feature = "browser")]
pub use browser::BrowserExtractor;
pub use cache::ScrapeCache;
pub use orchestrator::{Orchestrator, ScrapeError};
pub use static_html::StaticExtractor;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What kind of page an extraction call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Category listing (navigation / genre index pages).
    Categories,
    /// Product listing within a category.
    Products,
    /// Single product detail page (extended bundle + reviews).
    ProductDetail,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Categories => "categories",
            ContentType::Products => "products",
            ContentType::ProductDetail => "product_detail",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category extracted from a listing page. No storage identity yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedCategory {
    pub name: String,
    /// Deterministic function of `name` (see `normalize::slugify`).
    pub slug: String,
    pub source_url: String,
    /// Generated text, non-authoritative.
    pub description: String,
}

/// Product extracted from a listing or detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub condition: Option<String>,
    pub format: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    /// Extended bundle, populated only by product-detail extraction.
    pub detail: Option<ProductDetail>,
}

impl ScrapedProduct {
    /// Bare record with only the required field set.
    pub fn new(title: String, source_url: String) -> Self {
        Self {
            title,
            author: None,
            price: None,
            currency: normalize::DEFAULT_CURRENCY.to_string(),
            image_url: None,
            source_url,
            condition: None,
            format: None,
            rating: None,
            review_count: None,
            detail: None,
        }
    }
}

/// Extended product information from a detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub publisher: Option<String>,
    pub pages: Option<u32>,
    pub language: Option<String>,
    pub dimensions: Option<String>,
    pub synopsis: Option<String>,
    pub similar_products: Vec<String>,
    pub reviews: Vec<ScrapedReview>,
}

/// A single customer review. Owned by exactly one product; replaced
/// wholesale on re-scrape, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedReview {
    pub reviewer_name: Option<String>,
    /// 1-5 stars; unparsable ratings default to neutral 3.
    pub rating: i32,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    pub is_verified_purchase: bool,
    pub review_date: Option<NaiveDate>,
    pub helpful_count: Option<i32>,
}

impl Default for ScrapedReview {
    fn default() -> Self {
        Self {
            reviewer_name: None,
            rating: 3,
            review_title: None,
            review_text: None,
            is_verified_purchase: false,
            review_date: None,
            helpful_count: None,
        }
    }
}

/// Extraction output, shared by both extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrapedRecord {
    Category(ScrapedCategory),
    Product(ScrapedProduct),
}

impl ScrapedRecord {
    pub fn as_category(&self) -> Option<&ScrapedCategory> {
        match self {
            ScrapedRecord::Category(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_product(&self) -> Option<&ScrapedProduct> {
        match self {
            ScrapedRecord::Product(p) => Some(p),
            _ => None,
        }
    }
}

/// One extraction backend: rendered browser session or raw HTTP.
///
/// Implementations apply the shared strategy set and must treat a failed
/// field read as "field unknown", never as a call-level error.
#[async_trait]
pub trait Extractor: Send {
    /// Short name for log lines ("browser", "static").
    fn name(&self) -> &'static str;

    /// Extract all records of `content` from `url`. An empty vec is a valid
    /// outcome (the orchestrator treats it as "try the next stage").
    async fn extract(&mut self, content: ContentType, url: &str) -> anyhow::Result<Vec<ScrapedRecord>>;
}
