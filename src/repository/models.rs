//! Diesel ORM records for database tables.
//!
//! These mirror the tables in `schema.rs` and convert to/from the domain
//! models in `crate::models`.

use diesel::prelude::*;

use crate::schema;

/// Category row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryRecord {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub is_active: i32,
    pub display_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New category for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::categories)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub source_url: Option<&'a str>,
    pub is_active: i32,
    pub display_order: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Product row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductRecord {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub publisher: Option<String>,
    pub pages: Option<i32>,
    pub language: Option<String>,
    pub dimensions: Option<String>,
    pub condition: Option<String>,
    pub format: Option<String>,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub source_url: Option<String>,
    pub similar_products: String,
    pub is_available: i32,
    pub category_id: i32,
    pub created_at: String,
    pub updated_at: String,
    pub last_scraped_at: Option<String>,
}

/// New product for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::products)]
pub struct NewProduct<'a> {
    pub title: &'a str,
    pub author: Option<&'a str>,
    pub price: Option<f64>,
    pub currency: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub description: Option<&'a str>,
    pub isbn: Option<&'a str>,
    pub isbn13: Option<&'a str>,
    pub publisher: Option<&'a str>,
    pub pages: Option<i32>,
    pub language: Option<&'a str>,
    pub dimensions: Option<&'a str>,
    pub condition: Option<&'a str>,
    pub format: Option<&'a str>,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub source_url: Option<&'a str>,
    pub similar_products: &'a str,
    pub is_available: i32,
    pub category_id: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
    pub last_scraped_at: Option<&'a str>,
}

/// Product review row.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::product_reviews)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewRecord {
    pub id: i32,
    pub product_id: i32,
    pub reviewer_name: Option<String>,
    pub rating: i32,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    pub is_verified_purchase: i32,
    pub review_date: Option<String>,
    pub helpful_count: Option<i32>,
    pub created_at: String,
}

/// New review for bulk insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::product_reviews)]
pub struct NewReview {
    pub product_id: i32,
    pub reviewer_name: Option<String>,
    pub rating: i32,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    pub is_verified_purchase: i32,
    pub review_date: Option<String>,
    pub helpful_count: Option<i32>,
    pub created_at: String,
}
