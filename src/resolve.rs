//! Resolution orchestration.
//!
//! Turns a title identifier (and, for series, a season/episode pair) into a
//! normalized link list by walking the fallback chain:
//!
//! 1. **CacheHit** — a fresh cached result for the exact key wins.
//! 2. **RegistryLookup** — a verified feed handle from the registry drives
//!    the listen-feed parser (and the episode mapper for series).
//! 3. **ScrapeFallback** — movies only, and only when enabled: a best-guess
//!    page URL on the fallback site goes through the scraper set.
//! 4. **NotAvailable** — nothing produced a link; the failure result carries
//!    a caller-actionable suggestion code.
//!
//! Component failures are absorbed into "try the next strategy"; every call
//! returns a well-formed [`ResolutionResult`].

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::config::ResolverConfig;
use crate::episodes::{assign_episodes, EpisodeEntry};
use crate::error::{ResolveError, Result};
use crate::feed;
use crate::fetch::Fetcher;
use crate::registry::{RegistryCache, RegistryStats};
use crate::scrape::{dedup_links, ScrapeOptions, ScraperSet, StreamLink};

/// Source tag for results produced from a verified registry feed.
pub const SOURCE_REGISTRY_FEED: &str = "registry_feed";

/// Per-request resolution options.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Allow the generic scrape fallback when the registry has no hint.
    pub auto_scrape: bool,
    /// Title used to derive the fallback page URL when the registry does
    /// not know this id (substitute for the out-of-scope metadata catalog).
    pub title_hint: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { auto_scrape: true, title_hint: None }
    }
}

/// Normalized outcome of one resolution call.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub links: Vec<StreamLink>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Seconds spent producing the result (when it was first built).
    pub cache_time: f64,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_episodes: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_episodes_cached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_episodes: Option<Vec<u32>>,
}

impl ResolutionResult {
    fn success(source: String, links: Vec<StreamLink>, started: Instant) -> Self {
        let links = dedup_links(links);
        Self {
            success: true,
            source: Some(source),
            total: links.len(),
            links,
            error: None,
            detail: None,
            suggestion: None,
            cache_time: started.elapsed().as_secs_f64(),
            from_cache: false,
            season: None,
            episode: None,
            cached_episodes: None,
            all_episodes_cached: None,
            available_episodes: None,
        }
    }

    fn failure(code: &str, suggestion: Option<&str>, started: Instant) -> Self {
        Self {
            success: false,
            source: None,
            links: Vec::new(),
            total: 0,
            error: Some(code.to_string()),
            detail: None,
            suggestion: suggestion.map(str::to_string),
            cache_time: started.elapsed().as_secs_f64(),
            from_cache: false,
            season: None,
            episode: None,
            cached_episodes: None,
            all_episodes_cached: None,
            available_episodes: None,
        }
    }

    fn from_error(err: &ResolveError, started: Instant) -> Self {
        let mut result = Self::failure(err.code(), None, started);
        result.detail = Some(err.to_string());
        result
    }
}

/// Whole-season link batch: one feed fetch serves every episode request.
#[derive(Debug, Clone)]
struct SeasonBatch {
    source: String,
    episodes: BTreeMap<u32, Vec<StreamLink>>,
}

/// The resolution engine.
///
/// Owns the fetcher, the registry cache, the scraper set, and the response
/// caches — created at process start, dropped at shutdown, no hidden
/// globals.
pub struct Resolver {
    config: ResolverConfig,
    fetcher: Fetcher,
    registry: RegistryCache,
    scrapers: ScraperSet,
    movie_cache: ResponseCache<ResolutionResult>,
    season_cache: ResponseCache<SeasonBatch>,
}

impl Resolver {
    /// Build a resolver from a configuration.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let registry = RegistryCache::new(
            config.registry_url.clone(),
            config.cache_ttl,
            config.registry_timeout,
        );
        Ok(Self {
            fetcher,
            registry,
            scrapers: ScraperSet::new(),
            movie_cache: ResponseCache::new(config.cache_ttl),
            season_cache: ResponseCache::new(config.cache_ttl),
            config,
        })
    }

    /// Build a resolver configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ResolverConfig::from_env())
    }

    /// Resolve a movie to stream links.
    pub async fn resolve_movie(&self, id: &str, options: &ResolveOptions) -> ResolutionResult {
        let key = format!("links_{id}");
        if let Some(mut cached) = self.movie_cache.get(&key).await {
            debug!(id, "movie cache hit");
            cached.from_cache = true;
            return cached;
        }

        let started = Instant::now();
        let entry = self.registry.get(&self.fetcher, id).await;

        // Tier 1: verified feed handle from the registry.
        if let Some(listen_url) = entry.as_ref().and_then(|e| e.listen_url.as_deref()) {
            match feed::fetch_feed(&self.fetcher, listen_url).await {
                Ok(titles) => {
                    let links = feed::flatten(&titles);
                    if links.is_empty() {
                        debug!(id, "registry feed parsed but carried no links");
                    } else {
                        info!(id, total = links.len(), "resolved via registry feed");
                        let result = ResolutionResult::success(
                            SOURCE_REGISTRY_FEED.to_string(),
                            links,
                            started,
                        );
                        self.movie_cache.insert(&key, result.clone()).await;
                        return result;
                    }
                }
                Err(err) => warn!(id, error = %err, "registry feed failed"),
            }
        }

        // Tier 2: best-guess scrape of the fallback site.
        if options.auto_scrape {
            let title = options
                .title_hint
                .clone()
                .or_else(|| entry.as_ref().map(|e| e.title.clone()));
            if let Some(title) = title {
                let url = format!("{}/pelicula/{}", self.config.scrape_base, slugify(&title));
                match self.scrapers.extract(&url, &self.fetcher, &self.scrape_options(None)).await {
                    Ok((site, links)) if !links.is_empty() => {
                        info!(id, site, total = links.len(), "resolved via scrape fallback");
                        let result =
                            ResolutionResult::success(format!("auto_{site}"), links, started);
                        self.movie_cache.insert(&key, result.clone()).await;
                        return result;
                    }
                    Ok((site, _)) => debug!(id, site, "scrape fallback found no links"),
                    Err(err) => warn!(id, error = %err, "scrape fallback failed"),
                }
            } else {
                debug!(id, "no title available, skipping scrape fallback");
            }
        }

        ResolutionResult::failure("not_available", Some("request_movie"), started)
    }

    /// Resolve one episode of a series.
    ///
    /// The whole season is fetched and cached in one pass; the requested
    /// episode is sliced out of the batch.
    pub async fn resolve_episode(&self, id: &str, season: u32, episode: u32) -> ResolutionResult {
        let key = format!("series_{id}_s{season}");
        if let Some(batch) = self.season_cache.get(&key).await {
            debug!(id, season, "season cache hit");
            return Self::slice_episode(&batch, season, episode, true, Instant::now());
        }

        let started = Instant::now();
        let entry = self.registry.get(&self.fetcher, id).await;

        let Some(entry) = entry else {
            let mut result =
                ResolutionResult::failure("series_not_available", Some("request_series"), started);
            result.season = Some(season);
            result.episode = Some(episode);
            return result;
        };

        let listen_url = entry
            .seasons
            .as_ref()
            .and_then(|seasons| seasons.get(&season))
            .and_then(|s| s.listen_url.clone());
        let Some(listen_url) = listen_url else {
            let mut result =
                ResolutionResult::failure("season_not_available", Some("request_season"), started);
            result.season = Some(season);
            result.episode = Some(episode);
            return result;
        };

        let titles = match feed::fetch_feed(&self.fetcher, &listen_url).await {
            Ok(titles) => titles,
            Err(err) => {
                warn!(id, season, error = %err, "season feed failed");
                let mut result = ResolutionResult::from_error(&err, started);
                result.season = Some(season);
                result.episode = Some(episode);
                return result;
            }
        };

        let entries: Vec<EpisodeEntry> = titles
            .iter()
            .map(|title| EpisodeEntry { label: title.name.clone(), links: title.links() })
            .collect();
        let batch = SeasonBatch {
            source: SOURCE_REGISTRY_FEED.to_string(),
            episodes: assign_episodes(entries),
        };
        self.season_cache.insert(&key, batch.clone()).await;
        info!(id, season, episodes = batch.episodes.len(), "season batch cached");

        Self::slice_episode(&batch, season, episode, false, started)
    }

    /// Extract links from an explicit source URL (the link-extractor entry
    /// point). Unrecognized URLs are an explicit failure, never a silent
    /// empty success.
    pub async fn extract_from_url(
        &self,
        url: &str,
        listen_url: Option<&str>,
    ) -> ResolutionResult {
        let started = Instant::now();
        let options = self.scrape_options(listen_url.map(str::to_string));
        match self.scrapers.extract(url, &self.fetcher, &options).await {
            Ok((site, links)) => {
                let mut result = ResolutionResult::success(site.to_string(), links, started);
                if result.links.is_empty() {
                    result.success = false;
                    result.error = Some("not_available".to_string());
                }
                result
            }
            Err(err) => ResolutionResult::from_error(&err, started),
        }
    }

    /// Aggregate counts over the verified registry.
    pub async fn registry_stats(&self) -> RegistryStats {
        self.registry.stats(&self.fetcher).await
    }

    /// Whether the registry carries this title.
    pub async fn is_verified(&self, id: &str) -> bool {
        self.registry.contains(&self.fetcher, id).await
    }

    /// The shared fetcher (link probing, custom calls).
    #[must_use]
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    fn scrape_options(&self, listen_url: Option<String>) -> ScrapeOptions {
        ScrapeOptions { listen_url, proxy_api: self.config.proxy_api.clone() }
    }

    fn slice_episode(
        batch: &SeasonBatch,
        season: u32,
        episode: u32,
        from_cache: bool,
        started: Instant,
    ) -> ResolutionResult {
        let cached_episodes: Vec<u32> = batch.episodes.keys().copied().collect();

        let mut result = match batch.episodes.get(&episode) {
            Some(links) => {
                let mut r =
                    ResolutionResult::success(batch.source.clone(), links.clone(), started);
                r.cached_episodes = Some(cached_episodes);
                r.all_episodes_cached = Some(true);
                r
            }
            None => {
                let mut r = ResolutionResult::failure("episode_not_found", None, started);
                r.available_episodes = Some(cached_episodes);
                r
            }
        };
        result.season = Some(season);
        result.episode = Some(episode);
        result.from_cache = from_cache;
        result
    }
}

/// Lowercased, hyphen-joined slug for fallback page URLs.
fn slugify(title: &str) -> String {
    title.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
