//! Engine configuration.
//!
//! All knobs live in one explicitly constructed value so there is no hidden
//! global state; `from_env` gathers the deployment-specific pieces from the
//! environment.

use std::env;
use std::time::Duration;

/// Default TTL shared by the registry cache and the response caches.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Configuration for the resolution engine.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Raw URL of the hosted registry document. `None` disables the
    /// registry tier; resolution degrades to pure scraping.
    pub registry_url: Option<String>,
    /// Proxy-fetch API endpoint used as a secondary path when a scrape
    /// target answers 403 (e.g., ScraperAPI-style `?url=` passthrough).
    pub proxy_api: Option<String>,
    /// Base URL used to derive best-guess movie pages for the scrape
    /// fallback.
    pub scrape_base: String,
    /// Per-request timeout for page fetches.
    pub page_timeout: Duration,
    /// Per-request timeout for listen-feed fetches.
    pub feed_timeout: Duration,
    /// Per-request timeout for registry refreshes.
    pub registry_timeout: Duration,
    /// Maximum attempts per fetch, including the first.
    pub max_attempts: u32,
    /// TTL for cached registry copies and cached resolution results.
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            registry_url: None,
            proxy_api: None,
            scrape_base: "https://ww4.pelisplushd.to".to_string(),
            page_timeout: Duration::from_secs(20),
            feed_timeout: Duration::from_secs(25),
            registry_timeout: Duration::from_secs(10),
            max_attempts: 2,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl ResolverConfig {
    /// Build a config from the environment.
    ///
    /// Recognized variables: `REGISTRY_DB_URL` (registry document),
    /// `SCRAPER_PROXY_API` (proxy passthrough endpoint),
    /// `SCRAPE_BASE_URL` (fallback site base).
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.registry_url = env::var("REGISTRY_DB_URL").ok().filter(|s| !s.is_empty());
        cfg.proxy_api = env::var("SCRAPER_PROXY_API").ok().filter(|s| !s.is_empty());
        if let Ok(base) = env::var("SCRAPE_BASE_URL") {
            if !base.is_empty() {
                cfg.scrape_base = base;
            }
        }
        cfg
    }
}
