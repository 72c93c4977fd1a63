//! Kernel configuration.
//!
//! Defaults are usable as-is for tests and local runs; `from_env` overrides
//! individual fields from `DOCS_*` environment variables.

use std::time::Duration;

use crate::DOC_NAMESPACE;

/// Configuration for the table-of-contents cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of (manual, version) entries kept.
    pub max_entries: usize,
    /// Whether to enable the cache.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            enabled: true,
        }
    }
}

/// Kernel-wide settings.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Article path template; `$1` is replaced by the page path.
    pub article_path: String,
    /// Page the strict resolver sends readers to when no topic instance belongs
    /// to the latest released version.
    pub latest_fallback_path: String,
    /// Origin prefixed to rewritten links, e.g. `https://docs.example.com`.
    pub server_name: Option<String>,
    /// TOC cache bounds.
    pub toc_cache: CacheConfig,
    /// How long a navigation summary stays fresh.
    pub nav_cache_ttl: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            article_path: "/$1".to_string(),
            latest_fallback_path: "/Special:LatestDoc".to_string(),
            server_name: None,
            toc_cache: CacheConfig::default(),
            nav_cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl KernelConfig {
    /// Build configuration from environment variables, falling back to defaults.
    ///
    /// Reads `DOCS_ARTICLE_PATH`, `DOCS_LATEST_FALLBACK`, `DOCS_SERVER_NAME`,
    /// `DOCS_TOC_CACHE_SIZE` (0 disables the cache) and `DOCS_NAV_CACHE_TTL_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("DOCS_ARTICLE_PATH") {
            if path.contains("$1") {
                config.article_path = path;
            } else {
                tracing::warn!(value = %path, "DOCS_ARTICLE_PATH has no $1 placeholder, ignoring");
            }
        }
        if let Ok(path) = std::env::var("DOCS_LATEST_FALLBACK") {
            config.latest_fallback_path = path;
        }
        config.server_name = std::env::var("DOCS_SERVER_NAME").ok().filter(|s| !s.is_empty());

        if let Some(size) = std::env::var("DOCS_TOC_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.toc_cache = CacheConfig {
                max_entries: size,
                enabled: size > 0,
            };
        }
        if let Some(secs) = std::env::var("DOCS_NAV_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.nav_cache_ttl = Duration::from_secs(secs);
        }

        config
    }

    /// URL of a page under the article path.
    pub fn article_url(&self, page: &str) -> String {
        self.article_path.replace("$1", page)
    }

    /// Where failed resolutions send the reader.
    pub fn default_redirect(&self) -> String {
        self.article_url(DOC_NAMESPACE)
    }

    /// Aliased link to a topic, e.g. `/Documentation/2.0/User/Install`.
    pub fn topic_link(&self, version_segment: &str, manual: &str, slug: &str) -> String {
        self.article_url(&format!(
            "{}/{}/{}/{}",
            DOC_NAMESPACE, version_segment, manual, slug
        ))
    }
}
