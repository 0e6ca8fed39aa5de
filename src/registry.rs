//! Verified-title registry.
//!
//! A single remotely hosted JSON document maps external title ids to
//! pre-verified resolution hints: a listen-feed handle for movies, or a
//! season → feed-handle map for series. The whole document is cached with a
//! TTL and replaced wholesale on refresh; a failed refresh serves the stale
//! copy (or an empty registry if none was ever loaded) so resolution
//! degrades gracefully to pure scraping instead of failing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::CacheRecord;
use crate::error::Result;
use crate::fetch::Fetcher;

/// Content kind of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
}

/// Feed handle and page URL for one season of a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonEntry {
    #[serde(default)]
    pub listen_url: Option<String>,
    #[serde(default, alias = "zonahack_url")]
    pub page_url: Option<String>,
}

/// One verified title with its resolution hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Direct feed handle (movies).
    #[serde(default)]
    pub listen_url: Option<String>,
    #[serde(default, alias = "zonahack_url")]
    pub page_url: Option<String>,
    /// Season → feed handle map (series). Keys are positive season numbers.
    #[serde(default)]
    pub seasons: Option<BTreeMap<u32, SeasonEntry>>,
}

/// Aggregate counts over the registry document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub movies: usize,
    pub series: usize,
    pub seasons: usize,
}

type RegistryMap = HashMap<String, RegistryEntry>;

/// TTL-cached view of the remote registry document.
pub struct RegistryCache {
    url: Option<String>,
    ttl: Duration,
    timeout: Duration,
    state: RwLock<Option<CacheRecord<Arc<RegistryMap>>>>,
}

impl RegistryCache {
    /// Create a cache backed by the given document URL.
    ///
    /// With no URL configured the registry is permanently empty and lookups
    /// always miss; that is a valid scrape-only deployment, not an error.
    pub fn new(url: Option<String>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            url,
            ttl,
            timeout,
            state: RwLock::new(None),
        }
    }

    /// Current registry snapshot, refreshing if the cached copy expired.
    ///
    /// Never fails: refresh errors fall back to the stale copy, or to an
    /// empty registry when nothing was ever loaded.
    pub async fn snapshot(&self, fetcher: &Fetcher) -> Arc<RegistryMap> {
        if let Some(record) = self.state.read().await.as_ref() {
            if let Some(map) = record.fresh() {
                return Arc::clone(map);
            }
        }

        match self.fetch_document(fetcher).await {
            Ok(map) => {
                let map = Arc::new(map);
                let mut state = self.state.write().await;
                *state = Some(CacheRecord::new(Arc::clone(&map), self.ttl));
                map
            }
            Err(err) => {
                warn!(error = %err, "registry refresh failed, serving stale copy");
                self.state
                    .read()
                    .await
                    .as_ref()
                    .map_or_else(|| Arc::new(HashMap::new()), |r| Arc::clone(r.payload()))
            }
        }
    }

    /// Force a refresh attempt regardless of TTL.
    pub async fn refresh(&self, fetcher: &Fetcher) {
        let map = match self.fetch_document(fetcher).await {
            Ok(map) => map,
            Err(err) => {
                warn!(error = %err, "registry refresh failed");
                return;
            }
        };
        let mut state = self.state.write().await;
        *state = Some(CacheRecord::new(Arc::new(map), self.ttl));
    }

    /// Look up a title's entry.
    pub async fn get(&self, fetcher: &Fetcher, id: &str) -> Option<RegistryEntry> {
        self.snapshot(fetcher).await.get(id).cloned()
    }

    /// Whether the registry carries this title.
    pub async fn contains(&self, fetcher: &Fetcher, id: &str) -> bool {
        self.snapshot(fetcher).await.contains_key(id)
    }

    /// Aggregate counts over the current snapshot.
    pub async fn stats(&self, fetcher: &Fetcher) -> RegistryStats {
        let map = self.snapshot(fetcher).await;
        let movies = map.values().filter(|e| e.kind == ContentKind::Movie).count();
        let series = map.values().filter(|e| e.kind == ContentKind::Series).count();
        let seasons = map
            .values()
            .filter_map(|e| e.seasons.as_ref())
            .map(BTreeMap::len)
            .sum();
        RegistryStats { movies, series, seasons }
    }

    async fn fetch_document(&self, fetcher: &Fetcher) -> Result<RegistryMap> {
        let Some(url) = self.url.as_deref() else {
            debug!("no registry URL configured, registry is empty");
            return Ok(HashMap::new());
        };

        let response = fetcher
            .inner()
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let mut map: RegistryMap = response.json().await?;

        // Season 0 specials violate the positive-key invariant; drop them.
        for entry in map.values_mut() {
            if let Some(seasons) = entry.seasons.as_mut() {
                seasons.remove(&0);
            }
        }

        Ok(map)
    }

    #[cfg(test)]
    async fn store(&self, map: RegistryMap, ttl: Duration) {
        let mut state = self.state.write().await;
        *state = Some(CacheRecord::new(Arc::new(map), ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;

    const SAMPLE: &str = r#"{
        "603692": {
            "title": "John Wick 4",
            "type": "movie",
            "poster_path": "/vZloFAK7NmvMGKE7VkF5UHaz0I.jpg",
            "listen_url": "https://firestore.example/v1/listen?sid=abc",
            "zonahack_url": "https://zonahack.com.ar/ver/john-wick-4"
        },
        "1396": {
            "title": "Breaking Bad",
            "type": "series",
            "seasons": {
                "1": {"listen_url": "https://firestore.example/v1/listen?sid=s1"},
                "2": {"listen_url": "https://firestore.example/v1/listen?sid=s2"}
            }
        }
    }"#;

    fn sample_map() -> RegistryMap {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn document_deserializes_with_season_keys_as_integers() {
        let map = sample_map();
        let movie = &map["603692"];
        assert_eq!(movie.kind, ContentKind::Movie);
        assert!(movie.listen_url.is_some());
        assert_eq!(
            movie.page_url.as_deref(),
            Some("https://zonahack.com.ar/ver/john-wick-4")
        );

        let series = &map["1396"];
        assert_eq!(series.kind, ContentKind::Series);
        let seasons = series.seasons.as_ref().unwrap();
        assert!(seasons.keys().all(|&k| k > 0));
        assert!(seasons[&2].listen_url.is_some());
    }

    #[tokio::test]
    async fn unconfigured_registry_is_empty_not_an_error() {
        let fetcher = Fetcher::new(&ResolverConfig::default()).unwrap();
        let cache = RegistryCache::new(
            None,
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        assert!(cache.snapshot(&fetcher).await.is_empty());
        assert!(!cache.contains(&fetcher, "603692").await);
    }

    #[tokio::test]
    async fn stale_copy_served_when_refresh_fails() {
        let fetcher = Fetcher::new(&ResolverConfig::default()).unwrap();
        // Unreachable endpoint: every refresh attempt fails.
        let cache = RegistryCache::new(
            Some("http://127.0.0.1:1/registry.json".to_string()),
            Duration::from_secs(60),
            Duration::from_millis(200),
        );
        cache.store(sample_map(), Duration::from_millis(0)).await;

        // Expired record + failing refresh still satisfies prior lookups.
        let entry = cache.get(&fetcher, "603692").await.unwrap();
        assert_eq!(entry.title, "John Wick 4");
    }

    #[tokio::test]
    async fn stats_count_movies_series_and_seasons() {
        let fetcher = Fetcher::new(&ResolverConfig::default()).unwrap();
        let cache = RegistryCache::new(
            None,
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        cache.store(sample_map(), Duration::from_secs(60)).await;
        assert_eq!(
            cache.stats(&fetcher).await,
            RegistryStats { movies: 1, series: 1, seasons: 2 }
        );
    }
}
