//! PelisPlus playlist scraper.
//!
//! Stream entries live in `<li data-url="..." data-name="...">` playlist
//! items. The site blocks datacenter IPs aggressively, so a 403 on the
//! direct path falls back to a configured proxy-fetch endpoint; with no
//! proxy configured the error is surfaced with an actionable message
//! instead of retrying forever.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use super::{detect_server, ScrapeOptions, SiteScraper, StreamLink};
use crate::error::{ResolveError, Result};
use crate::fetch::Fetcher;

/// Scraper for pelisplushd.* mirrors.
pub struct PelisPlusScraper;

#[async_trait]
impl SiteScraper for PelisPlusScraper {
    fn name(&self) -> &'static str {
        "pelisplus"
    }

    fn matches(&self, url: &str) -> bool {
        url.to_lowercase().contains("pelisplushd")
    }

    async fn extract(
        &self,
        url: &str,
        fetcher: &Fetcher,
        options: &ScrapeOptions,
    ) -> Result<Vec<StreamLink>> {
        match fetcher.fetch_page(url, None).await {
            Ok(html) => Ok(parse_playlist(&html)),
            Err(ResolveError::Blocked { .. }) => {
                debug!(url, "direct fetch blocked, trying proxy path");
                self.extract_via_proxy(url, fetcher, options).await
            }
            Err(err) => Err(err),
        }
    }
}

impl PelisPlusScraper {
    /// Secondary path through the proxy-fetch API after a block.
    async fn extract_via_proxy(
        &self,
        url: &str,
        fetcher: &Fetcher,
        options: &ScrapeOptions,
    ) -> Result<Vec<StreamLink>> {
        let Some(proxy_api) = options.proxy_api.as_deref() else {
            tracing::warn!(url, "blocked and no proxy API configured");
            return Err(ResolveError::Configuration(
                "source IP is blocked (403); set SCRAPER_PROXY_API to a proxy-fetch \
                 endpoint to route around the block"
                    .to_string(),
            ));
        };

        let proxy_url = format!(
            "{proxy_api}?url={}&render=false",
            urlencoding::encode(url)
        );
        let response = fetcher
            .inner()
            .get(&proxy_url)
            .timeout(Duration::from_secs(25))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Fetch {
                status: status.as_u16(),
                url: proxy_url,
            });
        }

        Ok(parse_playlist(&response.text().await?))
    }
}

/// Pull stream entries out of the playlist markup.
pub(crate) fn parse_playlist(html: &str) -> Vec<StreamLink> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse("li[data-url]").expect("valid selector");
    let anchor_selector = Selector::parse("a").expect("valid selector");

    let mut links = Vec::new();
    for item in document.select(&item_selector) {
        let Some(url) = item.value().attr("data-url") else {
            continue;
        };
        let language = item
            .value()
            .attr("data-name")
            .unwrap_or("Desconocido")
            .to_string();

        // Server name from the visible anchor text, else the URL table.
        let anchor_text = item
            .select(&anchor_selector)
            .next()
            .map(|a| a.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let server = if anchor_text.is_empty() {
            detect_server(url).to_string()
        } else {
            title_case(&anchor_text)
        };

        links.push(StreamLink {
            server,
            url: url.to_string(),
            language,
        });
    }
    links
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::dedup_links;

    const PLAYLIST_HTML: &str = r##"
        <html><body>
        <ul class="TbVideoNv">
          <li data-url="https://streamwish.to/e/abc" data-name="Latino">
            <a href="#">streamwish</a>
          </li>
          <li data-url="https://voe.sx/e/def" data-name="Castellano">
            <a href="#"></a>
          </li>
          <li data-url="https://streamwish.to/e/abc" data-name="Latino">
            <a href="#">streamwish</a>
          </li>
          <li class="other">no data url here</li>
        </ul>
        </body></html>
    "##;

    #[test]
    fn playlist_items_become_links() {
        let links = parse_playlist(PLAYLIST_HTML);
        assert_eq!(links.len(), 3);

        assert_eq!(links[0].server, "Streamwish");
        assert_eq!(links[0].language, "Latino");
        assert_eq!(links[0].url, "https://streamwish.to/e/abc");

        // Empty anchor text falls back to the URL table.
        assert_eq!(links[1].server, "Voe");
        assert_eq!(links[1].language, "Castellano");
    }

    #[test]
    fn duplicates_collapse_after_dedup() {
        let links = dedup_links(parse_playlist(PLAYLIST_HTML));
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn matches_mirrors_case_insensitively() {
        let scraper = PelisPlusScraper;
        assert!(scraper.matches("https://ww4.pelisplushd.to/pelicula/dune"));
        assert!(scraper.matches("https://PELISPLUSHD.mx/pelicula/dune"));
        assert!(!scraper.matches("https://cuevana.biz/pelicula/dune"));
    }

    #[test]
    fn title_casing() {
        assert_eq!(title_case("streamwish"), "Streamwish");
        assert_eq!(title_case("STREAM TAPE"), "Stream Tape");
    }
}
