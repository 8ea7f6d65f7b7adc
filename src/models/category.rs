//! Category domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A book category with storage identity.
///
/// `name` and `slug` are both natural keys; `is_active` and
/// `display_order` are storage-owned presentation fields the scraping core
/// never touches after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
