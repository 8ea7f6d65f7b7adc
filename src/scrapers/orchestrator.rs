//! Crawl orchestrator: cache check, extractor fallback chain, attempt
//! budget.
//!
//! Strategies execute strictly in priority order: the browser extractor
//! against the target URL, then the static extractor against the same URL,
//! then the static extractor against each alternate URL. The first
//! non-empty result wins and is cached; empty-after-all-stages is the only
//! hard failure. A single stage's internal error or timeout is logged and
//! treated as zero records.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::ScrapeCache;
use super::{ContentType, Extractor, ScrapedRecord};

/// Cap on alternate URLs attempted per call (bounds page visits).
const MAX_ALTERNATE_URLS: usize = 3;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Every extractor and alternate URL yielded zero records.
    #[error("scraping {content_type} from {url} failed after {attempts} attempts")]
    Failed {
        content_type: ContentType,
        url: String,
        attempts: u32,
    },

    /// The target URL is not absolute or not on the configured origin.
    #[error("invalid scrape target {url}: {reason}")]
    InvalidTarget { url: String, reason: String },
}

/// Orchestrates one crawl per call. Owns its extractors; only the cache is
/// shared across calls.
pub struct Orchestrator {
    /// Preferred extractor (browser automation), absent when the runtime
    /// is unavailable or disabled.
    primary: Option<Box<dyn Extractor>>,
    /// Static-HTTP fallback. Always present.
    fallback: Box<dyn Extractor>,
    cache: Arc<ScrapeCache>,
    /// Per-attempt wall-clock timeout. The caller may impose a separate
    /// outer deadline on the whole orchestration.
    attempt_timeout: Duration,
    /// Restrict targets to this host when set.
    allowed_host: Option<String>,
}

impl Orchestrator {
    pub fn new(
        primary: Option<Box<dyn Extractor>>,
        fallback: Box<dyn Extractor>,
        cache: Arc<ScrapeCache>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache,
            attempt_timeout,
            allowed_host: None,
        }
    }

    /// Restrict scrape targets to a single host.
    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_host = Some(host.into());
        self
    }

    fn check_target(&self, url: &str) -> Result<(), ScrapeError> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidTarget {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidTarget {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        if let Some(ref host) = self.allowed_host {
            let target_host = parsed.host_str().unwrap_or("");
            if target_host != host && !target_host.ends_with(&format!(".{host}")) {
                return Err(ScrapeError::InvalidTarget {
                    url: url.to_string(),
                    reason: format!("host {target_host} is not {host}"),
                });
            }
        }
        Ok(())
    }

    /// Run one extractor attempt; errors and timeouts degrade to empty.
    async fn attempt(
        extractor: &mut Box<dyn Extractor>,
        content: ContentType,
        url: &str,
        timeout: Duration,
    ) -> Vec<ScrapedRecord> {
        let name = extractor.name();
        match tokio::time::timeout(timeout, extractor.extract(content, url)).await {
            Ok(Ok(records)) => {
                debug!(extractor = name, url, count = records.len(), "attempt finished");
                records
            }
            Ok(Err(e)) => {
                warn!(extractor = name, url, error = %e, "extractor failed, treating as empty");
                Vec::new()
            }
            Err(_) => {
                warn!(extractor = name, url, timeout_secs = timeout.as_secs(), "extractor timed out");
                Vec::new()
            }
        }
    }

    /// Scrape `content` from `url`, falling back through `alternates` in
    /// order. Returns the first non-empty result, serving and populating
    /// the cache as it goes.
    pub async fn scrape(
        &mut self,
        content: ContentType,
        url: &str,
        alternates: &[String],
    ) -> Result<Vec<ScrapedRecord>, ScrapeError> {
        self.check_target(url)?;

        if let Some(cached) = self.cache.get(content, url) {
            debug!(url, content = %content, "cache hit, skipping extraction");
            return Ok(cached);
        }

        let mut attempts: u32 = 0;

        if let Some(primary) = self.primary.as_mut() {
            attempts += 1;
            let records = Self::attempt(primary, content, url, self.attempt_timeout).await;
            if !records.is_empty() {
                info!(url, content = %content, count = records.len(), "primary extractor succeeded");
                self.cache.put(content, url, records.clone());
                return Ok(records);
            }
        }

        attempts += 1;
        let records = Self::attempt(&mut self.fallback, content, url, self.attempt_timeout).await;
        if !records.is_empty() {
            info!(url, content = %content, count = records.len(), "static fallback succeeded");
            self.cache.put(content, url, records.clone());
            return Ok(records);
        }

        for alternate in alternates.iter().take(MAX_ALTERNATE_URLS) {
            if self.check_target(alternate).is_err() {
                warn!(url = alternate, "skipping invalid alternate URL");
                continue;
            }
            attempts += 1;
            let records =
                Self::attempt(&mut self.fallback, content, alternate, self.attempt_timeout).await;
            if !records.is_empty() {
                info!(url = alternate, content = %content, count = records.len(), "alternate URL succeeded");
                // Cached under the requested key so repeat calls hit.
                self.cache.put(content, url, records.clone());
                return Ok(records);
            }
        }

        Err(ScrapeError::Failed {
            content_type: content,
            url: url.to_string(),
            attempts,
        })
    }
}

/// Ordered alternate URLs for a category: search-query fallbacks derived
/// from the category name.
pub fn search_fallback_urls(base_url: &str, category_name: &str) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let query = urlencoding::encode(category_name);
    vec![
        format!("{base}/search?q={query}"),
        format!("{base}/collections/{}", super::normalize::slugify(category_name)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::cache::CacheTtls;
    use crate::scrapers::ScrapedCategory;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<(String, String)>>>;

    /// Stub extractor returning a fixed record set for its first N calls.
    struct StubExtractor {
        name: &'static str,
        results: Vec<Vec<ScrapedRecord>>,
        calls: CallLog,
    }

    impl StubExtractor {
        fn new(name: &'static str, results: Vec<Vec<ScrapedRecord>>, calls: CallLog) -> Self {
            Self {
                name,
                results,
                calls,
            }
        }
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn extract(
            &mut self,
            _content: ContentType,
            url: &str,
        ) -> anyhow::Result<Vec<ScrapedRecord>> {
            self.calls
                .lock()
                .unwrap()
                .push((self.name.to_string(), url.to_string()));
            if self.results.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(self.results.remove(0))
            }
        }
    }

    fn record() -> ScrapedRecord {
        ScrapedRecord::Category(ScrapedCategory {
            name: "Fiction".to_string(),
            slug: "fiction".to_string(),
            source_url: "https://shop.example.com/category/fiction".to_string(),
            description: String::new(),
        })
    }

    fn cache() -> Arc<ScrapeCache> {
        Arc::new(ScrapeCache::default())
    }

    const URL: &str = "https://shop.example.com/categories";

    #[tokio::test]
    async fn test_first_non_empty_wins() {
        let calls: CallLog = Arc::default();
        let primary = StubExtractor::new("browser", vec![vec![record()]], calls.clone());
        let fallback = StubExtractor::new("static", vec![], calls.clone());

        let mut orch = Orchestrator::new(
            Some(Box::new(primary)),
            Box::new(fallback),
            cache(),
            Duration::from_secs(5),
        );
        let records = orch.scrape(ContentType::Categories, URL, &[]).await.unwrap();
        assert_eq!(records.len(), 1);

        // Static extractor was never consulted.
        let log = calls.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "browser");
    }

    #[tokio::test]
    async fn test_fallback_order_static_same_url_before_alternates() {
        let calls: CallLog = Arc::default();
        // Browser empty; static empty for primary URL, succeeds on alternate.
        let primary = StubExtractor::new("browser", vec![vec![]], calls.clone());
        let fallback =
            StubExtractor::new("static", vec![vec![], vec![record()]], calls.clone());

        let alternates = vec!["https://shop.example.com/search?q=fiction".to_string()];
        let mut orch = Orchestrator::new(
            Some(Box::new(primary)),
            Box::new(fallback),
            cache(),
            Duration::from_secs(5),
        );
        let records = orch
            .scrape(ContentType::Categories, URL, &alternates)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        let log = calls.lock().unwrap();
        let seq: Vec<(&str, &str)> = log.iter().map(|(n, u)| (n.as_str(), u.as_str())).collect();
        assert_eq!(
            seq,
            vec![
                ("browser", URL),
                ("static", URL),
                ("static", "https://shop.example.com/search?q=fiction"),
            ]
        );
    }

    #[tokio::test]
    async fn test_terminal_failure_carries_attempt_count_and_skips_cache() {
        let calls: CallLog = Arc::default();
        let primary = StubExtractor::new("browser", vec![], calls.clone());
        let fallback = StubExtractor::new("static", vec![], calls.clone());

        let shared_cache = cache();
        let alternates = vec!["https://shop.example.com/search?q=x".to_string()];
        let mut orch = Orchestrator::new(
            Some(Box::new(primary)),
            Box::new(fallback),
            shared_cache.clone(),
            Duration::from_secs(5),
        );
        let err = orch
            .scrape(ContentType::Categories, URL, &alternates)
            .await
            .unwrap_err();

        match err {
            ScrapeError::Failed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(shared_cache.get(ContentType::Categories, URL).is_none());
    }

    #[tokio::test]
    async fn test_cache_hit_suppresses_extraction() {
        let calls: CallLog = Arc::default();
        let shared_cache = Arc::new(ScrapeCache::new(CacheTtls {
            categories: Duration::from_secs(60),
            products: Duration::from_secs(60),
        }));

        // Two orchestration calls sharing one cache: extractors fire once.
        for _ in 0..2 {
            let primary = StubExtractor::new("browser", vec![vec![record()]], calls.clone());
            let fallback = StubExtractor::new("static", vec![], calls.clone());
            let mut orch = Orchestrator::new(
                Some(Box::new(primary)),
                Box::new(fallback),
                shared_cache.clone(),
                Duration::from_secs(5),
            );
            let records = orch.scrape(ContentType::Categories, URL, &[]).await.unwrap();
            assert_eq!(records.len(), 1);
        }

        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_extractor_error_degrades_to_fallback() {
        struct FailingExtractor;

        #[async_trait]
        impl Extractor for FailingExtractor {
            fn name(&self) -> &'static str {
                "browser"
            }
            async fn extract(
                &mut self,
                _content: ContentType,
                _url: &str,
            ) -> anyhow::Result<Vec<ScrapedRecord>> {
                Err(anyhow::anyhow!("browser runtime unavailable"))
            }
        }

        let calls: CallLog = Arc::default();
        let fallback = StubExtractor::new("static", vec![vec![record()]], calls.clone());
        let mut orch = Orchestrator::new(
            Some(Box::new(FailingExtractor)),
            Box::new(fallback),
            cache(),
            Duration::from_secs(5),
        );
        let records = orch.scrape(ContentType::Categories, URL, &[]).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_extractor_times_out_and_falls_back() {
        struct SlowExtractor;

        #[async_trait]
        impl Extractor for SlowExtractor {
            fn name(&self) -> &'static str {
                "browser"
            }
            async fn extract(
                &mut self,
                _content: ContentType,
                _url: &str,
            ) -> anyhow::Result<Vec<ScrapedRecord>> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![record()])
            }
        }

        let calls: CallLog = Arc::default();
        let fallback = StubExtractor::new("static", vec![vec![record()]], calls.clone());
        let mut orch = Orchestrator::new(
            Some(Box::new(SlowExtractor)),
            Box::new(fallback),
            cache(),
            Duration::from_millis(50),
        );

        // Exceeding the attempt timeout behaves exactly like an empty
        // result: the fallback runs and its records win.
        let records = orch.scrape(ContentType::Categories, URL, &[]).await.unwrap();
        assert_eq!(records.len(), 1);

        let log = calls.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "static");
    }

    #[tokio::test]
    async fn test_rejects_off_origin_target() {
        let calls: CallLog = Arc::default();
        let fallback = StubExtractor::new("static", vec![vec![record()]], calls.clone());
        let mut orch = Orchestrator::new(
            None,
            Box::new(fallback),
            cache(),
            Duration::from_secs(5),
        )
        .with_allowed_host("shop.example.com");

        assert!(orch
            .scrape(ContentType::Categories, "https://evil.example.net/x", &[])
            .await
            .is_err());
        assert!(calls.lock().unwrap().is_empty());

        // Subdomains of the allowed host pass.
        assert!(orch
            .scrape(ContentType::Categories, "https://www.shop.example.com/c", &[])
            .await
            .is_ok());
    }

    #[test]
    fn test_search_fallback_urls() {
        let urls = search_fallback_urls("https://shop.example.com/", "Science Fiction & Fantasy");
        assert_eq!(
            urls[0],
            "https://shop.example.com/search?q=Science%20Fiction%20%26%20Fantasy"
        );
        assert_eq!(urls[1], "https://shop.example.com/collections/science-fiction-fantasy");
    }
}
