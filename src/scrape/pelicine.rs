//! PeliCine iframe scraper.
//!
//! Players are embedded as iframes inside `div.Video` containers; some page
//! layouts also float bare iframes whose src points at a known hosting
//! server. Both are collected, URL-deduped, and labeled "Español" (the site
//! publishes a single dub track).

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{detect_server, ScrapeOptions, SiteScraper, StreamLink, SERVER_FINGERPRINTS};
use crate::error::Result;
use crate::fetch::Fetcher;

/// Scraper for pelicinehd.com.
pub struct PeliCineScraper;

#[async_trait]
impl SiteScraper for PeliCineScraper {
    fn name(&self) -> &'static str {
        "pelicine"
    }

    fn matches(&self, url: &str) -> bool {
        url.to_lowercase().contains("pelicinehd")
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
    let video_iframe = Selector::parse("div.Video iframe[src]").expect("valid selector");
    let any_iframe = Selector::parse("iframe[src]").expect("valid selector");

    let mut links: Vec<StreamLink> = Vec::new();
    let mut push = |url: &str| {
        if links.iter().any(|l| l.url == url) {
            return;
        }
        links.push(StreamLink {
            server: detect_server(url).to_string(),
            url: url.to_string(),
            language: "Español".to_string(),
        });
    };

    for iframe in document.select(&video_iframe) {
        if let Some(src) = iframe.value().attr("src") {
            push(src);
        }
    }

    // Bare iframes only count when they point at a known hosting server.
    for iframe in document.select(&any_iframe) {
        let Some(src) = iframe.value().attr("src") else {
            continue;
        };
        let lower = src.to_lowercase();
        if SERVER_FINGERPRINTS.iter().any(|f| lower.contains(f)) {
            push(src);
        }
    }

    links
}
