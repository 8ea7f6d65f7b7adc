//! Browser-automation extractor for script-rendered catalog pages.
//!
//! Drives a headless Chromium session over CDP, waits for the document to
//! settle, then applies the shared selector-strategy set to the rendered
//! DOM snapshot. One navigation per extraction call.

#![cfg(feature = "browser")]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::static_html::extract_from_html;
use super::{ContentType, Extractor, ScrapedRecord};

/// User agent reported by the browser session.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Fixed settle delay after document-ready, for late client-side rendering.
/// A heuristic, not a correctness guarantee.
const SETTLE_DELAY: Duration = Duration::from_millis(750);

/// Browser extractor configuration.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run headless (default true).
    pub headless: bool,
    /// Page load timeout.
    pub timeout: Duration,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            timeout: Duration::from_secs(30),
            chrome_args: Vec::new(),
        }
    }
}

/// Chromium-backed extractor. The browser process launches lazily on the
/// first call and is reused across calls from the same instance.
pub struct BrowserExtractor {
    options: BrowserOptions,
    synthetic_fill: bool,
    browser: Option<Arc<Mutex<Browser>>>,
}

impl BrowserExtractor {
    /// Common Chrome executable paths to check before consulting PATH.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    pub fn new(options: BrowserOptions, synthetic_fill: bool) -> Self {
        Self {
            options,
            synthetic_fill,
            browser: None,
        }
    }

    /// Locate a Chrome/Chromium executable.
    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Install it or run with --no-browser \
             to use plain HTTP extraction only."
        ))
    }

    /// Launch the browser if not already running.
    async fn ensure_browser(&mut self) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }

        info!("Launching browser (headless={})", self.options.headless);
        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if !self.options.headless {
            builder = builder.with_head();
        }
        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        for arg in &self.options.chrome_args {
            builder = builder.arg(arg.as_str());
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(Arc::new(Mutex::new(browser)));
        Ok(())
    }

    /// Navigate once and return the rendered DOM as HTML.
    async fn fetch_rendered(&mut self, url: &str) -> Result<String> {
        self.ensure_browser().await?;

        let browser = self.browser.as_ref().unwrap().lock().await;
        let page = browser.new_page("about:blank").await?;

        page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await?;

        debug!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;
        page.execute(nav_params).await?;

        // Wait for document readiness rather than a blind timeout.
        let ready_script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete' || document.readyState === 'interactive') {
                    resolve(document.readyState);
                } else {
                    document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                    setTimeout(() => resolve('timeout'), 10000);
                }
            })
        "#;
        match tokio::time::timeout(self.options.timeout, page.evaluate(ready_script.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result.into_value().unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }

        // Allow client-side rendering to finish.
        tokio::time::sleep(SETTLE_DELAY).await;

        let content = page.content().await?;

        // Close the page to prevent tab accumulation.
        let _ = page.close().await;

        Ok(content)
    }

    /// Shut the browser down.
    pub async fn close(&mut self) {
        self.browser = None;
    }
}

#[async_trait]
impl Extractor for BrowserExtractor {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn extract(&mut self, content: ContentType, url: &str) -> Result<Vec<ScrapedRecord>> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
        let body = self.fetch_rendered(url).await?;
        let records = extract_from_html(content, &body, &parsed, self.synthetic_fill);
        debug!(url, content = %content, count = records.len(), "browser extraction finished");
        Ok(records)
    }
}
