//! Category repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{CategoryRecord, NewCategory};
use super::pool::{AsyncSqlitePool, DieselError};
use super::{now_rfc3339, parse_datetime};
use crate::models::Category;
use crate::schema::categories;
use crate::scrapers::ScrapedCategory;

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        Category {
            id: record.id,
            name: record.name,
            slug: record.slug,
            description: record.description,
            source_url: record.source_url,
            is_active: record.is_active != 0,
            display_order: record.display_order,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Diesel-backed category repository.
#[derive(Clone)]
pub struct CategoryRepository {
    pool: AsyncSqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a category by id.
    pub async fn get(&self, id: i32) -> Result<Option<Category>, DieselError> {
        let mut conn = self.pool.get().await?;
        categories::table
            .find(id)
            .first::<CategoryRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Category::from))
    }

    /// Look up by natural key: name OR slug.
    pub async fn find_by_name_or_slug(
        &self,
        name: &str,
        slug: &str,
    ) -> Result<Option<Category>, DieselError> {
        let mut conn = self.pool.get().await?;
        categories::table
            .filter(categories::name.eq(name).or(categories::slug.eq(slug)))
            .first::<CategoryRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Category::from))
    }

    /// Find a category by slug alone.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DieselError> {
        let mut conn = self.pool.get().await?;
        categories::table
            .filter(categories::slug.eq(slug))
            .first::<CategoryRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Category::from))
    }

    /// Insert a scraped category. Fails with a unique violation when the
    /// name or slug already exists (callers recover by re-querying).
    pub async fn insert(&self, scraped: &ScrapedCategory) -> Result<Category, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_rfc3339();

        diesel::insert_into(categories::table)
            .values(NewCategory {
                name: &scraped.name,
                slug: &scraped.slug,
                description: Some(&scraped.description),
                source_url: Some(&scraped.source_url),
                is_active: 1,
                display_order: 0,
                created_at: &now,
                updated_at: &now,
            })
            .execute(&mut conn)
            .await?;

        categories::table
            .filter(categories::slug.eq(&scraped.slug))
            .first::<CategoryRecord>(&mut conn)
            .await
            .map(Category::from)
    }

    /// Refresh the scrape-owned mutable fields of an existing category.
    pub async fn update_scraped_fields(
        &self,
        id: i32,
        source_url: &str,
    ) -> Result<Category, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = now_rfc3339();

        diesel::update(categories::table.find(id))
            .set((
                categories::source_url.eq(Some(source_url)),
                categories::is_active.eq(1),
                categories::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        categories::table
            .find(id)
            .first::<CategoryRecord>(&mut conn)
            .await
            .map(Category::from)
    }

    /// All categories, ordered for display.
    pub async fn list(&self) -> Result<Vec<Category>, DieselError> {
        let mut conn = self.pool.get().await?;
        categories::table
            .order((categories::display_order.asc(), categories::name.asc()))
            .load::<CategoryRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Category::from).collect())
    }
}
