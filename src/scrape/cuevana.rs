//! Cuevana iframe scraper.
//!
//! Player iframes sit directly in the page; anything whose src matches the
//! hosting-server fingerprint list is a stream entry. The site serves the
//! Latin-American dub.

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{detect_server, ScrapeOptions, SiteScraper, StreamLink, SERVER_FINGERPRINTS};
use crate::error::Result;
use crate::fetch::Fetcher;

/// Scraper for cuevana.* mirrors.
pub struct CuevanaScraper;

#[async_trait]
impl SiteScraper for CuevanaScraper {
    fn name(&self) -> &'static str {
        "cuevana"
    }

    fn matches(&self, url: &str) -> bool {
        url.to_lowercase().contains("cuevana")
    }

    async fn extract(
        &self,
        url: &str,
        fetcher: &Fetcher,
        _options: &ScrapeOptions,
    ) -> Result<Vec<StreamLink>> {
        let html = fetcher.fetch_page(url, None).await?;
        Ok(parse_players(&html))
    }
}

pub(crate) fn parse_players(html: &str) -> Vec<StreamLink> {
    let document = Html::parse_document(html);
    let iframe_selector = Selector::parse("iframe[src]").expect("valid selector");

    let mut links = Vec::new();
    for iframe in document.select(&iframe_selector) {
        let Some(src) = iframe.value().attr("src") else {
            continue;
        };
        let lower = src.to_lowercase();
        if !SERVER_FINGERPRINTS.iter().any(|f| lower.contains(f)) {
            continue;
        }
        links.push(StreamLink {
            server: detect_server(src).to_string(),
            url: src.to_string(),
            language: "Latino".to_string(),
        });
    }
    links
}
