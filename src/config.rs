//! Configuration management for bookdex.
//!
//! Settings load from an optional TOML file with environment overrides
//! (`BOOKDEX_DATA_DIR`, `BOOKDEX_BASE_URL`), on top of serde defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::scrapers::cache::CacheTtls;

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "bookdex.db";

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Data directory holding the SQLite database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub origin: OriginConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            origin: OriginConfig::default(),
            scrape: ScrapeConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// The retail origin being ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Base URL of the origin site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the category index page, relative to the base URL.
    #[serde(default = "default_categories_path")]
    pub categories_path: String,

    /// Extra category-index URLs to try when the primary page is empty.
    #[serde(default)]
    pub alternate_category_paths: Vec<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            categories_path: default_categories_path(),
            alternate_category_paths: Vec::new(),
        }
    }
}

impl OriginConfig {
    /// Absolute URL of the category index.
    pub fn categories_url(&self) -> String {
        join_url(&self.base_url, &self.categories_path)
    }

    /// Absolute forms of the alternate category paths.
    pub fn alternate_category_urls(&self) -> Vec<String> {
        self.alternate_category_paths
            .iter()
            .map(|p| join_url(&self.base_url, p))
            .collect()
    }

    /// Host component of the base URL, for origin restriction.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

/// Extraction behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Try the browser extractor before falling back to plain HTTP.
    #[serde(default = "default_true")]
    pub use_browser: bool,

    /// Run the browser headless.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Per-attempt wall-clock timeout in seconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Substitute deterministic plausible values for unreadable
    /// condition/format/rating/review-count fields instead of leaving
    /// them null. Off by default; intended for demo/seed data only.
    #[serde(default)]
    pub synthetic_fill: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            use_browser: true,
            headless: true,
            attempt_timeout_secs: default_attempt_timeout(),
            synthetic_fill: false,
        }
    }
}

impl ScrapeConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// Result-cache TTLs. Category listings change less often than product
/// listings, so they cache longer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_categories_ttl")]
    pub categories_ttl_minutes: u64,

    #[serde(default = "default_products_ttl")]
    pub products_ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            categories_ttl_minutes: default_categories_ttl(),
            products_ttl_minutes: default_products_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            categories: Duration::from_secs(self.categories_ttl_minutes * 60),
            products: Duration::from_secs(self.products_ttl_minutes * 60),
        }
    }
}

/// Web server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bookdex"))
        .unwrap_or_else(|| PathBuf::from("./bookdex-data"))
}

fn default_base_url() -> String {
    "https://www.worldofbooks.com".to_string()
}

fn default_categories_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_attempt_timeout() -> u64 {
    30
}

fn default_categories_ttl() -> u64 {
    30
}

fn default_products_ttl() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl Settings {
    /// Load settings: explicit config file, or `bookdex.toml` in the
    /// working directory if present, else defaults. Environment variables
    /// override the file.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new("bookdex.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(dir) = std::env::var("BOOKDEX_DATA_DIR") {
            settings.data_dir = PathBuf::from(shellexpand::tilde(&dir).into_owned());
        }
        if let Ok(base) = std::env::var("BOOKDEX_BASE_URL") {
            settings.origin.base_url = base;
        }

        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        if let Some(s) = settings.data_dir.to_str() {
            settings.data_dir = PathBuf::from(shellexpand::tilde(s).into_owned());
        }
        Ok(settings)
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}
