//! Listen-stream feed parsing.
//!
//! A feed handle is a provider session URL whose response is a batched
//! document stream: an optional anti-JSON-hijacking marker line followed by
//! repeated `{"document": {...}, "targetIds": ...}` objects. Each document
//! carries per-language server maps under fixed field names. Fragments that
//! fail to parse are skipped; only a feed with no parseable documents at all
//! is an error.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{ResolveError, Result};
use crate::fetch::Fetcher;
use crate::scrape::StreamLink;

/// Origin pinned on feed requests; the provider rejects others.
const FEED_ORIGIN: &str = "https://zonahack.com.ar";

/// Language buckets by fixed field name, in presentation order.
const LANGUAGE_BUCKETS: &[(&str, &str)] = &[
    ("SERVERCASTELLANO", "Castellano"),
    ("SERVERSUB", "Subtitulado"),
    ("IDIOMAS", "Latino"),
];

static XSSI_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\)\]\}'\s*").expect("valid XSSI prefix pattern"));

static DOCUMENT_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"document"\s*:\s*\{(.*?)\}\s*,\s*"targetIds""#)
        .expect("valid document fragment pattern")
});

/// One parsed feed document: a title with its per-language server maps.
#[derive(Debug, Clone)]
pub struct FeedTitle {
    /// Free-text name label (e.g., `"Show 1x03"`); absent on some documents.
    pub name: Option<String>,
    /// Language buckets in fixed order; empty buckets are dropped.
    pub buckets: Vec<LanguageBucket>,
}

/// Server → URL map for one language.
#[derive(Debug, Clone)]
pub struct LanguageBucket {
    pub language: &'static str,
    pub servers: BTreeMap<String, String>,
}

impl FeedTitle {
    /// Flatten this title's buckets into stream links, bucket order first.
    #[must_use]
    pub fn links(&self) -> Vec<StreamLink> {
        self.buckets
            .iter()
            .flat_map(|bucket| {
                bucket.servers.iter().map(|(server, url)| StreamLink {
                    server: server.clone(),
                    url: url.clone(),
                    language: bucket.language.to_string(),
                })
            })
            .collect()
    }
}

/// Flatten all titles into a single ordered link list.
#[must_use]
pub fn flatten(titles: &[FeedTitle]) -> Vec<StreamLink> {
    titles.iter().flat_map(FeedTitle::links).collect()
}

// Wire shape of one document's fields. Value kinds the engine does not
// consume simply deserialize to a pair of `None`s.
#[derive(Debug, Deserialize)]
struct ListenDocument {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    string_value: Option<String>,
    map_value: Option<MapValue>,
}

#[derive(Debug, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

/// Fetch and parse a listen feed.
pub async fn fetch_feed(fetcher: &Fetcher, listen_url: &str) -> Result<Vec<FeedTitle>> {
    let user_agent = fetcher.user_agent().await;
    let response = fetcher
        .inner()
        .get(listen_url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .header(reqwest::header::ACCEPT, "*/*")
        .header(reqwest::header::ORIGIN, FEED_ORIGIN)
        .header(reqwest::header::REFERER, format!("{FEED_ORIGIN}/"))
        .timeout(fetcher.feed_timeout())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::Fetch {
            status: status.as_u16(),
            url: listen_url.to_string(),
        });
    }

    parse_feed(&response.text().await?)
}

/// Parse a raw feed body into titles.
///
/// Returns [`ResolveError::NoListenData`] when no fragment parses at all.
/// Documents whose buckets are all empty still count as parsed: a title with
/// no published servers is an empty result, not a dead session.
pub fn parse_feed(body: &str) -> Result<Vec<FeedTitle>> {
    let text = XSSI_PREFIX.replace(body, "");

    let mut titles = Vec::new();
    for capture in DOCUMENT_FRAGMENT.captures_iter(&text) {
        let fragment = format!("{{{}}}", &capture[1]);
        let document: ListenDocument = match serde_json::from_str(&fragment) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(error = %err, "skipping unparseable feed fragment");
                continue;
            }
        };
        titles.push(title_from_document(&document));
    }

    if titles.is_empty() {
        return Err(ResolveError::NoListenData);
    }
    Ok(titles)
}

fn title_from_document(document: &ListenDocument) -> FeedTitle {
    let name = document
        .fields
        .get("NOMBRE")
        .and_then(|f| f.string_value.clone());

    let mut buckets = Vec::new();
    for (field, language) in LANGUAGE_BUCKETS {
        let Some(map) = document.fields.get(*field).and_then(|f| f.map_value.as_ref())
        else {
            continue;
        };

        let servers: BTreeMap<String, String> = map
            .fields
            .iter()
            .filter_map(|(server, value)| {
                value
                    .string_value
                    .as_deref()
                    .map(|url| (server.clone(), decode_iframe_redirect(url)))
            })
            .collect();

        if !servers.is_empty() {
            buckets.push(LanguageBucket { language, servers });
        }
    }

    FeedTitle { name, buckets }
}

/// Decode `…/iframe.html?url=<inner>` redirect wrappers to their target.
#[must_use]
pub fn decode_iframe_redirect(url: &str) -> String {
    if !url.contains("iframe.html?url=") {
        return url.to_string();
    }
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map_or_else(|| url.to_string(), |(_, inner)| inner.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_body(documents: &[&str]) -> String {
        let mut body = String::from(")]}'\n");
        for doc in documents {
            body.push_str(&format!(
                r#"[{{"document": {doc}, "targetIds": [2]}}]"#
            ));
            body.push('\n');
        }
        body
    }

    const LATINO_DOC: &str = r#"{
        "name": "projects/p/databases/(default)/documents/peliculas/abc",
        "fields": {
            "NOMBRE": {"stringValue": "Dune"},
            "IDIOMAS": {"mapValue": {"fields": {
                "StreamWish": {"stringValue": "https://streamwish.to/e/abc"},
                "Voe": {"stringValue": "https://voe.sx/e/def"}
            }}}
        }
    }"#;

    #[test]
    fn latino_bucket_with_two_servers_yields_two_latino_links() {
        let titles = parse_feed(&feed_body(&[LATINO_DOC])).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].name.as_deref(), Some("Dune"));

        let links = flatten(&titles);
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.language == "Latino"));
    }

    #[test]
    fn all_three_buckets_in_fixed_order() {
        let doc = r#"{
            "fields": {
                "NOMBRE": {"stringValue": "Dune"},
                "IDIOMAS": {"mapValue": {"fields": {
                    "Voe": {"stringValue": "https://voe.sx/e/lat"}
                }}},
                "SERVERSUB": {"mapValue": {"fields": {
                    "Voe": {"stringValue": "https://voe.sx/e/sub"}
                }}},
                "SERVERCASTELLANO": {"mapValue": {"fields": {
                    "Voe": {"stringValue": "https://voe.sx/e/cas"}
                }}}
            }
        }"#;
        let titles = parse_feed(&feed_body(&[doc])).unwrap();
        let languages: Vec<&str> =
            titles[0].buckets.iter().map(|b| b.language).collect();
        assert_eq!(languages, vec!["Castellano", "Subtitulado", "Latino"]);
    }

    #[test]
    fn unparseable_fragments_are_skipped_not_fatal() {
        let body = format!(
            "{}{}",
            feed_body(&[r#"{"fields": oops}"#]),
            feed_body(&[LATINO_DOC])
        );
        let titles = parse_feed(&body).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].name.as_deref(), Some("Dune"));
    }

    #[test]
    fn no_documents_is_no_listen_data() {
        let err = parse_feed(")]}'\n[]").unwrap_err();
        assert_eq!(err.code(), "no_listen_data");
    }

    #[test]
    fn empty_buckets_still_parse_as_a_title() {
        let doc = r#"{"fields": {"NOMBRE": {"stringValue": "Dune"}}}"#;
        let titles = parse_feed(&feed_body(&[doc])).unwrap();
        assert_eq!(titles.len(), 1);
        assert!(titles[0].buckets.is_empty());
        assert!(flatten(&titles).is_empty());
    }

    #[test]
    fn iframe_redirect_decoding() {
        assert_eq!(
            decode_iframe_redirect(
                "https://teomovie.web.app/iframe.html?url=https%3A%2F%2Fvoe.sx%2Fe%2Fabc"
            ),
            "https://voe.sx/e/abc"
        );
        assert_eq!(
            decode_iframe_redirect("https://voe.sx/e/abc"),
            "https://voe.sx/e/abc"
        );
    }

    #[test]
    fn xssi_prefix_is_optional() {
        let body = feed_body(&[LATINO_DOC]);
        let without_prefix = body.strip_prefix(")]}'\n").unwrap();
        assert!(parse_feed(without_prefix).is_ok());
    }
}
