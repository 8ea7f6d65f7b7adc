//! Product domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A book with storage identity, natural-keyed by (title, category_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
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
    pub similar_products: Vec<String>,
    pub is_available: bool,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_scraped_at: Option<DateTime<Utc>>,
}
