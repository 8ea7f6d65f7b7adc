//! Product and review repository.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{NewProduct, NewReview, ProductRecord, ReviewRecord};
use super::pool::{AsyncSqlitePool, DieselError};
use super::{now_rfc3339, parse_date_opt, parse_datetime, parse_datetime_opt};
use crate::models::{Product, ProductReview};
use crate::schema::{product_reviews, products};
use crate::scrapers::{ScrapedProduct, ScrapedReview};

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        Product {
            id: record.id,
            title: record.title,
            author: record.author,
            price: record.price,
            currency: record.currency,
            image_url: record.image_url,
            description: record.description,
            isbn: record.isbn,
            isbn13: record.isbn13,
            publisher: record.publisher,
            pages: record.pages,
            language: record.language,
            dimensions: record.dimensions,
            condition: record.condition,
            format: record.format,
            rating: record.rating,
            review_count: record.review_count,
            source_url: record.source_url,
            similar_products: serde_json::from_str(&record.similar_products).unwrap_or_default(),
            is_available: record.is_available != 0,
            category_id: record.category_id,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            last_scraped_at: parse_datetime_opt(record.last_scraped_at),
        }
    }
}

impl From<ReviewRecord> for ProductReview {
    fn from(record: ReviewRecord) -> Self {
        ProductReview {
            id: record.id,
            product_id: record.product_id,
            reviewer_name: record.reviewer_name,
            rating: record.rating,
            review_title: record.review_title,
            review_text: record.review_text,
            is_verified_purchase: record.is_verified_purchase != 0,
            review_date: parse_date_opt(record.review_date),
            helpful_count: record.helpful_count,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

fn review_row(product_id: i32, review: &ScrapedReview, now: &str) -> NewReview {
    NewReview {
        product_id,
        reviewer_name: review.reviewer_name.clone(),
        rating: review.rating,
        review_title: review.review_title.clone(),
        review_text: review.review_text.clone(),
        is_verified_purchase: review.is_verified_purchase as i32,
        review_date: review.review_date.map(|d| d.format("%Y-%m-%d").to_string()),
        helpful_count: review.helpful_count,
        created_at: now.to_string(),
    }
}

/// Diesel-backed product and review repository.
#[derive(Clone)]
pub struct ProductRepository {
    pool: AsyncSqlitePool,
}

impl ProductRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a product by id.
    pub async fn get(&self, id: i32) -> Result<Option<Product>, DieselError> {
        let mut conn = self.pool.get().await?;
        products::table
            .find(id)
            .first::<ProductRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Product::from))
    }

    /// Look up by natural key: (title, category_id).
    pub async fn find_by_title_and_category(
        &self,
        title: &str,
        category_id: i32,
    ) -> Result<Option<Product>, DieselError> {
        let mut conn = self.pool.get().await?;
        products::table
            .filter(products::title.eq(title))
            .filter(products::category_id.eq(category_id))
            .first::<ProductRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Product::from))
    }

    /// Insert a scraped product into a category. Fails with a unique
    /// violation on the (title, category_id) key.
    pub async fn insert(
        &self,
        category_id: i32,
        scraped: &ScrapedProduct,
    ) -> Result<Product, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_rfc3339();
        let detail = scraped.detail.as_ref();
        let similar = detail
            .map(|d| serde_json::to_string(&d.similar_products).unwrap_or_else(|_| "[]".into()))
            .unwrap_or_else(|| "[]".to_string());

        diesel::insert_into(products::table)
            .values(NewProduct {
                title: &scraped.title,
                author: scraped.author.as_deref(),
                price: scraped.price,
                currency: Some(&scraped.currency),
                image_url: scraped.image_url.as_deref(),
                description: detail.and_then(|d| d.synopsis.as_deref()),
                isbn: detail.and_then(|d| d.isbn.as_deref()),
                isbn13: detail.and_then(|d| d.isbn13.as_deref()),
                publisher: detail.and_then(|d| d.publisher.as_deref()),
                pages: detail.and_then(|d| d.pages.map(|p| p as i32)),
                language: detail.and_then(|d| d.language.as_deref()),
                dimensions: detail.and_then(|d| d.dimensions.as_deref()),
                condition: scraped.condition.as_deref(),
                format: scraped.format.as_deref(),
                rating: scraped.rating,
                review_count: scraped.review_count.unwrap_or(0) as i32,
                source_url: Some(&scraped.source_url),
                similar_products: &similar,
                is_available: 1,
                category_id,
                created_at: &now,
                updated_at: &now,
                last_scraped_at: Some(&now),
            })
            .execute(&mut conn)
            .await?;

        products::table
            .filter(products::title.eq(&scraped.title))
            .filter(products::category_id.eq(category_id))
            .first::<ProductRecord>(&mut conn)
            .await
            .map(Product::from)
    }

    /// Refresh an existing product from a fresh scrape and bump its
    /// last-scraped timestamp. Detail-bundle columns are only touched when
    /// the scrape actually carried a bundle.
    pub async fn update_from_scrape(
        &self,
        id: i32,
        scraped: &ScrapedProduct,
    ) -> Result<Product, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_rfc3339();

        diesel::update(products::table.find(id))
            .set((
                products::author.eq(scraped.author.as_deref()),
                products::price.eq(scraped.price),
                products::currency.eq(Some(scraped.currency.as_str())),
                products::image_url.eq(scraped.image_url.as_deref()),
                products::condition.eq(scraped.condition.as_deref()),
                products::format.eq(scraped.format.as_deref()),
                products::rating.eq(scraped.rating),
                products::review_count.eq(scraped.review_count.unwrap_or(0) as i32),
                products::source_url.eq(Some(scraped.source_url.as_str())),
                products::is_available.eq(1),
                products::updated_at.eq(&now),
                products::last_scraped_at.eq(Some(&now)),
            ))
            .execute(&mut conn)
            .await?;

        if let Some(detail) = scraped.detail.as_ref() {
            let similar =
                serde_json::to_string(&detail.similar_products).unwrap_or_else(|_| "[]".into());
            diesel::update(products::table.find(id))
                .set((
                    products::description.eq(detail.synopsis.as_deref()),
                    products::isbn.eq(detail.isbn.as_deref()),
                    products::isbn13.eq(detail.isbn13.as_deref()),
                    products::publisher.eq(detail.publisher.as_deref()),
                    products::pages.eq(detail.pages.map(|p| p as i32)),
                    products::language.eq(detail.language.as_deref()),
                    products::dimensions.eq(detail.dimensions.as_deref()),
                    products::similar_products.eq(&similar),
                ))
                .execute(&mut conn)
                .await?;
        }

        products::table
            .find(id)
            .first::<ProductRecord>(&mut conn)
            .await
            .map(Product::from)
    }

    /// Paginated listing, optionally scoped to one category.
    pub async fn list(
        &self,
        category_id: Option<i32>,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Product>, i64), DieselError> {
        let mut conn = self.pool.get().await?;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let total: i64 = {
            let mut count = products::table.into_boxed();
            if let Some(cid) = category_id {
                count = count.filter(products::category_id.eq(cid));
            }
            count.count().get_result(&mut conn).await?
        };

        let mut query = products::table.into_boxed();
        if let Some(cid) = category_id {
            query = query.filter(products::category_id.eq(cid));
        }
        let records = query
            .order(products::created_at.desc())
            .limit(per_page)
            .offset((page - 1) * per_page)
            .load::<ProductRecord>(&mut conn)
            .await?;

        Ok((records.into_iter().map(Product::from).collect(), total))
    }

    /// Replace all reviews for a product: delete-then-insert in one
    /// transaction. Returns the number of reviews stored.
    pub async fn replace_reviews(
        &self,
        product_id: i32,
        reviews: &[ScrapedReview],
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_rfc3339();
        let rows: Vec<NewReview> = reviews.iter().map(|r| review_row(product_id, r, &now)).collect();

        conn.transaction::<_, DieselError, _>(|conn| {
            async move {
                diesel::delete(product_reviews::table.filter(product_reviews::product_id.eq(product_id)))
                    .execute(conn)
                    .await?;
                // Row-at-a-time: the async SQLite wrapper does not support
                // batch inserts.
                for row in &rows {
                    diesel::insert_into(product_reviews::table)
                        .values(row)
                        .execute(conn)
                        .await?;
                }
                Ok(rows.len())
            }
            .scope_boxed()
        })
        .await
    }

    /// All reviews for a product, in insertion order.
    pub async fn list_reviews(&self, product_id: i32) -> Result<Vec<ProductReview>, DieselError> {
        let mut conn = self.pool.get().await?;
        product_reviews::table
            .filter(product_reviews::product_id.eq(product_id))
            .order(product_reviews::id.asc())
            .load::<ReviewRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(ProductReview::from).collect())
    }
}
