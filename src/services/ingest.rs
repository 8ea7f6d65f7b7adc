//! Ingestion entry points: trigger a crawl, reconcile the results.
//!
//! Each call builds its own orchestrator (and browser session); only the
//! result cache is shared across calls.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::Settings;
use crate::models::{Category, Product};
#[cfg(feature = "browser")]
use crate::scrapers::browser::{BrowserExtractor, BrowserOptions};
use crate::scrapers::orchestrator::search_fallback_urls;
use crate::scrapers::{
    ContentType, Extractor, Orchestrator, ScrapeCache, ScrapeError, ScrapedProduct,
    ScrapedRecord, StaticExtractor,
};
use crate::repository::{AsyncSqlitePool, CategoryRepository, DieselError, ProductRepository};
use crate::services::reconcile::{BatchOutcome, ReconcileError, Reconciler};

/// Errors surfaced by ingestion calls.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Db(#[from] DieselError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Top-level ingestion service used by the CLI and the API server.
#[derive(Clone)]
pub struct IngestService {
    settings: Settings,
    cache: Arc<ScrapeCache>,
    categories: CategoryRepository,
    products: ProductRepository,
    reconciler: Reconciler,
}

impl IngestService {
    pub fn new(settings: Settings, pool: AsyncSqlitePool) -> Self {
        let cache = Arc::new(ScrapeCache::new(settings.cache.ttls()));
        let categories = CategoryRepository::new(pool.clone());
        let products = ProductRepository::new(pool);
        let reconciler = Reconciler::new(categories.clone(), products.clone());
        Self {
            settings,
            cache,
            categories,
            products,
            reconciler,
        }
    }

    /// Build the per-call orchestrator: browser first (when enabled and
    /// compiled in), static HTTP as the fallback.
    fn orchestrator(&self) -> Result<Orchestrator, IngestError> {
        let timeout = self.settings.scrape.attempt_timeout();
        let synthetic_fill = self.settings.scrape.synthetic_fill;

        let fallback = StaticExtractor::new(timeout, synthetic_fill)?;

        #[cfg(feature = "browser")]
        let primary: Option<Box<dyn Extractor>> = if self.settings.scrape.use_browser {
            Some(Box::new(BrowserExtractor::new(
                BrowserOptions {
                    headless: self.settings.scrape.headless,
                    timeout,
                    chrome_args: Vec::new(),
                },
                synthetic_fill,
            )))
        } else {
            None
        };
        #[cfg(not(feature = "browser"))]
        let primary: Option<Box<dyn Extractor>> = None;

        let mut orchestrator =
            Orchestrator::new(primary, Box::new(fallback), self.cache.clone(), timeout);
        if let Some(host) = self.settings.origin.host() {
            orchestrator = orchestrator.with_allowed_host(host);
        }
        Ok(orchestrator)
    }

    /// Scrape the origin's category index and reconcile it into storage.
    pub async fn scrape_categories(&self) -> Result<BatchOutcome<Category>, IngestError> {
        let url = self.settings.origin.categories_url();
        let alternates = self.settings.origin.alternate_category_urls();

        let records = self
            .orchestrator()?
            .scrape(ContentType::Categories, &url, &alternates)
            .await?;
        let scraped: Vec<_> = records
            .into_iter()
            .filter_map(|r| match r {
                ScrapedRecord::Category(c) => Some(c),
                _ => None,
            })
            .collect();

        info!(count = scraped.len(), "scraped categories, reconciling");
        Ok(self.reconciler.reconcile_categories(&scraped).await)
    }

    /// Scrape the product listing of one category (by numeric id or slug)
    /// and reconcile it into storage.
    pub async fn scrape_products(
        &self,
        category: &str,
    ) -> Result<BatchOutcome<Product>, IngestError> {
        let stored = match category.parse::<i32>() {
            Ok(id) => self.categories.get(id).await?,
            Err(_) => self.categories.find_by_slug(category).await?,
        }
        .ok_or_else(|| ReconcileError::CategoryNotFound(category.to_string()))?;

        let url = stored.source_url.clone().unwrap_or_else(|| {
            format!(
                "{}/category/{}",
                self.settings.origin.base_url.trim_end_matches('/'),
                stored.slug
            )
        });
        let alternates = search_fallback_urls(&self.settings.origin.base_url, &stored.name);

        let records = self
            .orchestrator()?
            .scrape(ContentType::Products, &url, &alternates)
            .await?;
        let scraped: Vec<ScrapedProduct> = records
            .into_iter()
            .filter_map(|r| match r {
                ScrapedRecord::Product(p) => Some(p),
                _ => None,
            })
            .collect();

        info!(category = %stored.name, count = scraped.len(), "scraped products, reconciling");
        Ok(self.reconciler.reconcile_products(stored.id, &scraped).await?)
    }

    /// Scrape one product's detail page: refresh its fields, store the
    /// extended bundle, and replace its reviews wholesale.
    pub async fn scrape_product_detail(&self, product_id: i32) -> Result<Product, IngestError> {
        let stored = self
            .products
            .get(product_id)
            .await?
            .ok_or(ReconcileError::ProductNotFound(product_id))?;
        let url = stored
            .source_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("product {product_id} has no source URL"))?;

        let records = self
            .orchestrator()?
            .scrape(ContentType::ProductDetail, &url, &[])
            .await?;
        let scraped = records
            .into_iter()
            .find_map(|r| match r {
                ScrapedRecord::Product(p) => Some(p),
                _ => None,
            })
            .ok_or(ScrapeError::Failed {
                content_type: ContentType::ProductDetail,
                url,
                attempts: 1,
            })?;

        let updated = self
            .reconciler
            .upsert_product(stored.category_id, &scraped)
            .await?;
        if let Some(detail) = scraped.detail.as_ref() {
            let stored_reviews = self
                .reconciler
                .replace_reviews(updated.id, &detail.reviews)
                .await?;
            info!(product = %updated.title, reviews = stored_reviews, "product detail reconciled");
        }

        Ok(updated)
    }

    /// Read access for the API layer.
    pub fn categories(&self) -> &CategoryRepository {
        &self.categories
    }

    pub fn products(&self) -> &ProductRepository {
        &self.products
    }
}
