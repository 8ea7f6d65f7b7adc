//! Schema creation for the bookdex database.
//!
//! CREATE IF NOT EXISTS statements, safe to run on every startup.

use diesel_async::SimpleAsyncConnection;

use super::pool::{AsyncSqlitePool, DieselError};

/// Full schema. Natural-key uniqueness lives here: categories are unique by
/// name and by slug, products by (title, category_id). Reviews cascade with
/// their product.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    description TEXT,
    source_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    author TEXT,
    price DOUBLE,
    currency TEXT,
    image_url TEXT,
    description TEXT,
    isbn TEXT,
    isbn13 TEXT,
    publisher TEXT,
    pages INTEGER,
    language TEXT,
    dimensions TEXT,
    condition TEXT,
    format TEXT,
    rating DOUBLE,
    review_count INTEGER NOT NULL DEFAULT 0,
    source_url TEXT,
    similar_products TEXT NOT NULL DEFAULT '[]',
    is_available INTEGER NOT NULL DEFAULT 1,
    category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_scraped_at TEXT,
    UNIQUE (title, category_id)
);

CREATE TABLE IF NOT EXISTS product_reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    reviewer_name TEXT,
    rating INTEGER NOT NULL,
    review_title TEXT,
    review_text TEXT,
    is_verified_purchase INTEGER NOT NULL DEFAULT 0,
    review_date TEXT,
    helpful_count INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_reviews_product ON product_reviews(product_id);
"#;

/// Create all tables and indexes if they do not exist.
pub async fn run_migrations(pool: &AsyncSqlitePool) -> Result<(), DieselError> {
    let mut conn = pool.get().await?;
    conn.batch_execute(SCHEMA_SQL).await?;
    Ok(())
}
