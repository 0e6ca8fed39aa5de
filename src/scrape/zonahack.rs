//! ZonaHack feed-handle scraper.
//!
//! The site's pages carry no scrapeable markup; stream links come from a
//! listen-feed session URL captured per title and stored in the registry.
//! This variant exists so the generic extraction entry point can serve
//! zonahack URLs too: it delegates to the feed parser and flattens every
//! language bucket into one link list.

use async_trait::async_trait;

use super::{ScrapeOptions, SiteScraper, StreamLink};
use crate::error::{ResolveError, Result};
use crate::fetch::Fetcher;
use crate::feed;

/// Scraper for zonahack.com.ar, backed by the listen feed.
pub struct ZonaHackScraper;

#[async_trait]
impl SiteScraper for ZonaHackScraper {
    fn name(&self) -> &'static str {
        "zonahack"
    }

    fn matches(&self, url: &str) -> bool {
        url.to_lowercase().contains("zonahack")
    }

    async fn extract(
        &self,
        _url: &str,
        fetcher: &Fetcher,
        options: &ScrapeOptions,
    ) -> Result<Vec<StreamLink>> {
        let Some(listen_url) = options.listen_url.as_deref() else {
            return Err(ResolveError::Configuration(
                "zonahack extraction requires a listen feed URL".to_string(),
            ));
        };

        let titles = feed::fetch_feed(fetcher, listen_url).await?;
        Ok(feed::flatten(&titles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;

    #[tokio::test]
    async fn missing_listen_url_is_a_configuration_error() {
        let fetcher = Fetcher::new(&ResolverConfig::default()).unwrap();
        let err = ZonaHackScraper
            .extract(
                "https://zonahack.com.ar/ver/dune",
                &fetcher,
                &ScrapeOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "configuration");
    }
}
