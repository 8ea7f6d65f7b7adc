//! Short-TTL cache for scrape results.
//!
//! Keyed by (content type, normalized URL). A hit within the TTL window
//! suppresses re-scraping the same target; staleness is bounded purely by
//! expiry, there is no explicit invalidation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::{ContentType, ScrapedRecord};

/// Default TTL for category listings (low volatility).
const DEFAULT_CATEGORIES_TTL: Duration = Duration::from_secs(30 * 60);

/// Default TTL for product listings and detail pages.
const DEFAULT_PRODUCTS_TTL: Duration = Duration::from_secs(10 * 60);

/// Prune threshold: entries are swept once the map grows past this.
const PRUNE_THRESHOLD: usize = 200;

struct CacheEntry {
    records: Vec<ScrapedRecord>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Per-content-type TTL configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub categories: Duration,
    pub products: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES_TTL,
            products: DEFAULT_PRODUCTS_TTL,
        }
    }
}

/// TTL cache over scrape results. Holds copies, never live references.
pub struct ScrapeCache {
    entries: RwLock<HashMap<(ContentType, String), CacheEntry>>,
    ttls: CacheTtls,
}

impl ScrapeCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttls,
        }
    }

    fn ttl_for(&self, content: ContentType) -> Duration {
        match content {
            ContentType::Categories => self.ttls.categories,
            ContentType::Products | ContentType::ProductDetail => self.ttls.products,
        }
    }

    /// Normalize a URL for keying: strip fragment and trailing slash.
    fn normalize_key(url: &str) -> String {
        let without_fragment = url.split('#').next().unwrap_or(url);
        without_fragment.trim_end_matches('/').to_string()
    }

    /// Cached records for (content, url), or None when missing/expired.
    pub fn get(&self, content: ContentType, url: &str) -> Option<Vec<ScrapedRecord>> {
        let key = (content, Self::normalize_key(url));
        self.entries.read().ok().and_then(|guard| {
            guard.get(&key).and_then(|e| {
                if e.is_expired() {
                    None
                } else {
                    Some(e.records.clone())
                }
            })
        })
    }

    /// Store records for (content, url) under the content type's TTL.
    pub fn put(&self, content: ContentType, url: &str, records: Vec<ScrapedRecord>) {
        let ttl = self.ttl_for(content);
        let key = (content, Self::normalize_key(url));
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(
                key,
                CacheEntry {
                    records,
                    expires_at: Instant::now() + ttl,
                },
            );
            if guard.len() > PRUNE_THRESHOLD {
                guard.retain(|_, entry| !entry.is_expired());
            }
        }
    }
}

impl Default for ScrapeCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}
