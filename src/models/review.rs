//! Product review domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A customer review. Owned by one product; replaced wholesale on each
/// re-scrape of that product's detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: i32,
    pub product_id: i32,
    pub reviewer_name: Option<String>,
    pub rating: i32,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    pub is_verified_purchase: bool,
    pub review_date: Option<NaiveDate>,
    pub helpful_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}
