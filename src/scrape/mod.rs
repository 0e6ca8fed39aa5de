//! Site-specific link extraction.
//!
//! Each source site gets one scraper variant that knows how to recognize
//! its URLs and pull stream entries out of its markup or API shape.
//!
//! # Architecture
//!
//! - [`SiteScraper`]: async trait for site-specific extraction
//! - [`ScraperSet`]: dispatches URLs to the right variant, priority order
//! - [`StreamLink`]: one playable server entry, deduped by `(url, language)`
//!
//! A scraper that fails or finds nothing is a local failure: the
//! orchestrator moves on to the next strategy, never aborting the request.

pub mod cuevana;
pub mod pelicine;
pub mod pelisplus;
pub mod zonahack;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};
use crate::fetch::Fetcher;

/// One playable stream entry.
///
/// Equality and hashing consider only `(url, language)`; the server label is
/// presentation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamLink {
    pub server: String,
    pub url: String,
    pub language: String,
}

impl PartialEq for StreamLink {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.language == other.language
    }
}

impl Eq for StreamLink {}

impl std::hash::Hash for StreamLink {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.language.hash(state);
    }
}

/// Per-extraction options passed down from the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Listen-feed session URL, required by the feed-handle variant.
    pub listen_url: Option<String>,
    /// Proxy-fetch endpoint used as a secondary path on 403.
    pub proxy_api: Option<String>,
}

/// Scraper for one source site.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Short lowercase site tag (e.g., `"pelisplus"`).
    fn name(&self) -> &'static str;

    /// Returns `true` if this scraper handles the given URL.
    fn matches(&self, url: &str) -> bool;

    /// Extract stream links from the URL.
    async fn extract(
        &self,
        url: &str,
        fetcher: &Fetcher,
        options: &ScrapeOptions,
    ) -> Result<Vec<StreamLink>>;
}

/// Routes target URLs to scraper variants.
///
/// Variants are checked in registration order; first match wins.
pub struct ScraperSet {
    scrapers: Vec<Box<dyn SiteScraper>>,
}

impl ScraperSet {
    /// Create a set with all variants in priority order.
    #[must_use]
    pub fn new() -> Self {
        let scrapers: Vec<Box<dyn SiteScraper>> = vec![
            Box::new(pelisplus::PelisPlusScraper),
            Box::new(pelicine::PeliCineScraper),
            Box::new(cuevana::CuevanaScraper),
            Box::new(zonahack::ZonaHackScraper),
        ];
        Self::with_scrapers(scrapers)
    }

    /// Create a set from an explicit variant list (priority order).
    #[must_use]
    pub fn with_scrapers(scrapers: Vec<Box<dyn SiteScraper>>) -> Self {
        Self { scrapers }
    }

    /// The variant claiming this URL, if any.
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&dyn SiteScraper> {
        self.scrapers
            .iter()
            .find(|s| s.matches(url))
            .map(|s| s.as_ref())
    }

    /// Extract links through the matching variant.
    ///
    /// An unclaimed URL is an explicit [`ResolveError::UnrecognizedSource`],
    /// never a silent empty success.
    pub async fn extract(
        &self,
        url: &str,
        fetcher: &Fetcher,
        options: &ScrapeOptions,
    ) -> Result<(&'static str, Vec<StreamLink>)> {
        let scraper = self
            .find(url)
            .ok_or_else(|| ResolveError::UnrecognizedSource(url.to_string()))?;
        let links = scraper.extract(url, fetcher, options).await?;
        Ok((scraper.name(), dedup_links(links)))
    }
}

impl Default for ScraperSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove `(url, language)` duplicates, preserving first-seen order.
#[must_use]
pub fn dedup_links(links: Vec<StreamLink>) -> Vec<StreamLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert((link.url.clone(), link.language.clone())))
        .collect()
}

/// URL-fragment → display-name table for hosting servers.
///
/// First substring match wins; order matters for overlapping fragments
/// (`doodstream` before `dood`).
const SERVER_TABLE: &[(&str, &str)] = &[
    ("streamwish", "StreamWish"),
    ("hgplaycdn", "StreamWish"),
    ("vidhide", "VidHide"),
    ("filelions", "VidHide"),
    ("voe.sx", "Voe"),
    ("voe", "Voe"),
    ("streamtape", "StreamTape"),
    ("filemoon", "FileMoon"),
    ("waaw", "Waaw"),
    ("netu", "Netu"),
    ("fembed", "Fembed"),
    ("watchsb", "StreamSB"),
    ("streamsb", "StreamSB"),
    ("streamlare", "StreamLare"),
    ("doodstream", "DoodStream"),
    ("dood", "DoodStream"),
    ("mixdrop", "MixDrop"),
    ("upstream", "UpStream"),
];

/// URL fragments identifying embeds worth collecting from generic iframes.
pub(crate) const SERVER_FINGERPRINTS: &[&str] =
    &["voe", "streamwish", "filemoon", "vidhide", "streamtape"];

/// Resolve a human-readable server name from a stream URL.
#[must_use]
pub fn detect_server(url: &str) -> &'static str {
    let lower = url.to_lowercase();
    SERVER_TABLE
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map_or("Unknown", |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, language: &str) -> StreamLink {
        StreamLink {
            server: "s".to_string(),
            url: url.to_string(),
            language: language.to_string(),
        }
    }

    #[test]
    fn server_detection_first_match_wins() {
        assert_eq!(detect_server("https://streamwish.to/e/abc"), "StreamWish");
        assert_eq!(detect_server("https://voe.sx/e/abc"), "Voe");
        assert_eq!(detect_server("https://dood.la/e/abc"), "DoodStream");
        assert_eq!(detect_server("https://FILELIONS.com/v/x"), "VidHide");
        assert_eq!(detect_server("https://example.com/video"), "Unknown");
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let links = vec![
            link("https://a/1", "Latino"),
            link("https://a/2", "Latino"),
            link("https://a/1", "Latino"),
            link("https://a/1", "Castellano"),
        ];
        let unique = dedup_links(links);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].url, "https://a/1");
        assert_eq!(unique[1].url, "https://a/2");
        assert_eq!(unique[2].language, "Castellano");
    }

    #[test]
    fn router_dispatches_by_domain_fragment() {
        let set = ScraperSet::new();
        assert_eq!(
            set.find("https://ww4.PelisPlusHD.to/pelicula/dune").unwrap().name(),
            "pelisplus"
        );
        assert_eq!(
            set.find("https://pelicinehd.com/pelicula/dune").unwrap().name(),
            "pelicine"
        );
        assert_eq!(
            set.find("https://www.cuevana.biz/pelicula/dune").unwrap().name(),
            "cuevana"
        );
        assert_eq!(
            set.find("https://zonahack.com.ar/ver/dune").unwrap().name(),
            "zonahack"
        );
        assert!(set.find("https://example.com/movie").is_none());
    }

    #[tokio::test]
    async fn unrecognized_url_is_an_explicit_error() {
        let set = ScraperSet::new();
        let fetcher = Fetcher::new(&crate::config::ResolverConfig::default()).unwrap();
        let err = set
            .extract("https://example.com/movie", &fetcher, &ScrapeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unrecognized_source");
    }
}
