//! Persistence reconciler: maps scraped value objects onto natural keys
//! and performs insert-or-merge against storage.
//!
//! Upserts are conflict-driven: insert first, and on a unique-constraint
//! violation (a benign race with a concurrent identical upsert) re-query
//! the natural key and merge into the now-existing row. There is no
//! check-then-insert window.

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Category, Product};
use crate::repository::{
    is_unique_violation, CategoryRepository, DieselError, ProductRepository,
};
use crate::scrapers::{ScrapedCategory, ScrapedProduct, ScrapedReview};

/// Errors surfaced by reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reconciliation requested against a category that does not exist.
    /// Distinct from scrape failure.
    #[error("category {0} not found")]
    CategoryNotFound(String),

    /// Reconciliation requested against a product id that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(i32),

    /// Any persistence error other than the recovered unique-violation
    /// race propagates unmodified.
    #[error(transparent)]
    Db(#[from] DieselError),
}

/// Result of reconciling a batch: the successfully persisted subset plus
/// per-item error messages. Batches never fail wholesale on item errors.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub saved: Vec<T>,
    pub errors: Vec<String>,
}

/// The only component that assigns or looks up storage identity for
/// scraped records.
#[derive(Clone)]
pub struct Reconciler {
    categories: CategoryRepository,
    products: ProductRepository,
}

impl Reconciler {
    pub fn new(categories: CategoryRepository, products: ProductRepository) -> Self {
        Self {
            categories,
            products,
        }
    }

    /// Insert-or-merge a category by (name | slug).
    pub async fn upsert_category(
        &self,
        scraped: &ScrapedCategory,
    ) -> Result<Category, ReconcileError> {
        if let Some(existing) = self
            .categories
            .find_by_name_or_slug(&scraped.name, &scraped.slug)
            .await?
        {
            debug!(name = %scraped.name, id = existing.id, "category exists, refreshing");
            return Ok(self
                .categories
                .update_scraped_fields(existing.id, &scraped.source_url)
                .await?);
        }

        match self.categories.insert(scraped).await {
            Ok(category) => Ok(category),
            Err(e) if is_unique_violation(&e) => {
                warn!(name = %scraped.name, "category insert raced, re-querying natural key");
                let existing = self
                    .categories
                    .find_by_name_or_slug(&scraped.name, &scraped.slug)
                    .await?
                    .ok_or(ReconcileError::Db(e))?;
                Ok(self
                    .categories
                    .update_scraped_fields(existing.id, &scraped.source_url)
                    .await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert-or-merge a product by (title, category_id). The category
    /// must already exist.
    pub async fn upsert_product(
        &self,
        category_id: i32,
        scraped: &ScrapedProduct,
    ) -> Result<Product, ReconcileError> {
        if self.categories.get(category_id).await?.is_none() {
            return Err(ReconcileError::CategoryNotFound(category_id.to_string()));
        }

        if let Some(existing) = self
            .products
            .find_by_title_and_category(&scraped.title, category_id)
            .await?
        {
            debug!(title = %scraped.title, id = existing.id, "product exists, refreshing");
            return Ok(self.products.update_from_scrape(existing.id, scraped).await?);
        }

        match self.products.insert(category_id, scraped).await {
            Ok(product) => Ok(product),
            Err(e) if is_unique_violation(&e) => {
                warn!(title = %scraped.title, "product insert raced, re-querying natural key");
                let existing = self
                    .products
                    .find_by_title_and_category(&scraped.title, category_id)
                    .await?
                    .ok_or(ReconcileError::Db(e))?;
                Ok(self.products.update_from_scrape(existing.id, scraped).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a product's reviews wholesale (delete-then-insert).
    pub async fn replace_reviews(
        &self,
        product_id: i32,
        reviews: &[ScrapedReview],
    ) -> Result<usize, ReconcileError> {
        if self.products.get(product_id).await?.is_none() {
            return Err(ReconcileError::ProductNotFound(product_id));
        }
        Ok(self.products.replace_reviews(product_id, reviews).await?)
    }

    /// Reconcile a scraped category batch, collecting per-item failures.
    pub async fn reconcile_categories(&self, scraped: &[ScrapedCategory]) -> BatchOutcome<Category> {
        let mut outcome = BatchOutcome {
            saved: Vec::new(),
            errors: Vec::new(),
        };
        for item in scraped {
            match self.upsert_category(item).await {
                Ok(category) => outcome.saved.push(category),
                Err(e) => {
                    warn!(name = %item.name, error = %e, "failed to persist category");
                    outcome.errors.push(format!("{}: {e}", item.name));
                }
            }
        }
        outcome
    }

    /// Reconcile a scraped product batch into one category. A missing
    /// category fails the call; individual item failures do not.
    pub async fn reconcile_products(
        &self,
        category_id: i32,
        scraped: &[ScrapedProduct],
    ) -> Result<BatchOutcome<Product>, ReconcileError> {
        if self.categories.get(category_id).await?.is_none() {
            return Err(ReconcileError::CategoryNotFound(category_id.to_string()));
        }

        let mut outcome = BatchOutcome {
            saved: Vec::new(),
            errors: Vec::new(),
        };
        for item in scraped {
            match self.upsert_product(category_id, item).await {
                Ok(product) => outcome.saved.push(product),
                Err(e) => {
                    warn!(title = %item.title, error = %e, "failed to persist product");
                    outcome.errors.push(format!("{}: {e}", item.title));
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{run_migrations, AsyncSqlitePool};
    use crate::scrapers::normalize::slugify;
    use tempfile::tempdir;

    async fn setup() -> (Reconciler, ProductRepository, CategoryRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        run_migrations(&pool).await.unwrap();
        let categories = CategoryRepository::new(pool.clone());
        let products = ProductRepository::new(pool.clone());
        (
            Reconciler::new(categories.clone(), products.clone()),
            products,
            categories,
            dir,
        )
    }

    fn category(name: &str) -> ScrapedCategory {
        ScrapedCategory {
            name: name.to_string(),
            slug: slugify(name),
            source_url: format!("https://shop.example.com/category/{}", slugify(name)),
            description: format!("Explore our {name} collection."),
        }
    }

    fn product(title: &str) -> ScrapedProduct {
        ScrapedProduct::new(
            title.to_string(),
            format!("https://shop.example.com/p/{}", slugify(title)),
        )
    }

    fn review(name: &str, rating: i32) -> ScrapedReview {
        ScrapedReview {
            reviewer_name: Some(name.to_string()),
            rating,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_category_upsert_idempotent() {
        let (reconciler, _, categories, _dir) = setup().await;

        let first = reconciler.upsert_category(&category("Fiction")).await.unwrap();
        let second = reconciler.upsert_category(&category("Fiction")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(categories.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_slug_match_updates_existing() {
        let (reconciler, _, _, _dir) = setup().await;

        let first = reconciler.upsert_category(&category("Fiction")).await.unwrap();
        // Same slug, refreshed source URL: merged into the same row.
        let mut refreshed = category("Fiction");
        refreshed.source_url = "https://shop.example.com/c/fiction-v2".to_string();
        let second = reconciler.upsert_category(&refreshed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            second.source_url.as_deref(),
            Some("https://shop.example.com/c/fiction-v2")
        );
    }

    #[tokio::test]
    async fn test_concurrent_identical_upserts_converge() {
        let (reconciler, _, categories, _dir) = setup().await;

        let scraped = category("History");
        let a = reconciler.upsert_category(&scraped);
        let b = reconciler.upsert_category(&scraped);
        let (a, b) = tokio::join!(a, b);

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        assert_eq!(categories.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_unique_violation() {
        let (_, _, categories, _dir) = setup().await;

        categories.insert(&category("Romance")).await.unwrap();
        let err = categories.insert(&category("Romance")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_product_upsert_requires_category() {
        let (reconciler, _, _, _dir) = setup().await;

        let err = reconciler.upsert_product(999, &product("Dune")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_product_upsert_refreshes_and_bumps_timestamp() {
        let (reconciler, _, _, _dir) = setup().await;
        let cat = reconciler.upsert_category(&category("Fiction")).await.unwrap();

        let first = reconciler.upsert_product(cat.id, &product("Dune")).await.unwrap();
        assert!(first.is_available);
        assert!(first.last_scraped_at.is_some());

        let mut rescrape = product("Dune");
        rescrape.price = Some(7.99);
        let second = reconciler.upsert_product(cat.id, &rescrape).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.price, Some(7.99));
        assert!(second.last_scraped_at >= first.last_scraped_at);
    }

    #[tokio::test]
    async fn test_same_title_different_category_is_distinct() {
        let (reconciler, _, _, _dir) = setup().await;
        let fiction = reconciler.upsert_category(&category("Fiction")).await.unwrap();
        let classics = reconciler.upsert_category(&category("Classics")).await.unwrap();

        let a = reconciler.upsert_product(fiction.id, &product("Dune")).await.unwrap();
        let b = reconciler.upsert_product(classics.id, &product("Dune")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_reviews_replaced_wholesale() {
        let (reconciler, products, _, _dir) = setup().await;
        let cat = reconciler.upsert_category(&category("Fiction")).await.unwrap();
        let stored = reconciler.upsert_product(cat.id, &product("Dune")).await.unwrap();

        reconciler
            .replace_reviews(stored.id, &[review("Alice", 5), review("Bob", 4)])
            .await
            .unwrap();
        reconciler
            .replace_reviews(stored.id, &[review("Carol", 2)])
            .await
            .unwrap();

        let reviews = products.list_reviews(stored.id).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].reviewer_name.as_deref(), Some("Carol"));
        assert_eq!(reviews[0].rating, 2);
    }

    #[tokio::test]
    async fn test_replace_reviews_stores_full_batch() {
        let (reconciler, products, _, _dir) = setup().await;
        let cat = reconciler.upsert_category(&category("Fiction")).await.unwrap();
        let stored = reconciler.upsert_product(cat.id, &product("Dune")).await.unwrap();

        let batch: Vec<ScrapedReview> = (0..25)
            .map(|i| review(&format!("Reader {i}"), 1 + (i % 5)))
            .collect();
        let n = reconciler.replace_reviews(stored.id, &batch).await.unwrap();
        assert_eq!(n, 25);

        let reviews = products.list_reviews(stored.id).await.unwrap();
        assert_eq!(reviews.len(), 25);
        assert_eq!(reviews[0].reviewer_name.as_deref(), Some("Reader 0"));
        assert_eq!(reviews[24].reviewer_name.as_deref(), Some("Reader 24"));
    }

    #[tokio::test]
    async fn test_replace_reviews_missing_product() {
        let (reconciler, _, _, _dir) = setup().await;
        let err = reconciler.replace_reviews(42, &[review("Alice", 5)]).await.unwrap_err();
        assert!(matches!(err, ReconcileError::ProductNotFound(42)));
    }

    #[tokio::test]
    async fn test_batch_partial_success() {
        let (reconciler, _, _, _dir) = setup().await;
        let cat = reconciler.upsert_category(&category("Fiction")).await.unwrap();

        // A batch where two titles collide on the natural key is fine: the
        // second one merges instead of erroring.
        let batch = vec![product("Dune"), product("Emma"), product("Dune")];
        let outcome = reconciler.reconcile_products(cat.id, &batch).await.unwrap();
        assert_eq!(outcome.saved.len(), 3);
        assert!(outcome.errors.is_empty());

        let (all, total) = reconciler.products.list(Some(cat.id), 1, 50).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);
    }
}
