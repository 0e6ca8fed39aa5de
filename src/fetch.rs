//! Outbound HTTP with anti-blocking countermeasures.
//!
//! One [`Fetcher`] is shared by every component that touches the network.
//! It wraps a pooled `reqwest` client carrying a browser fingerprint and
//! adds the retry policy the scraped sites require: bounded attempts, a
//! short fixed delay between them, and user-agent rotation when a source
//! answers 403.
//!
//! All timeouts are explicit so a resolution request can never hang past
//! its caller's own budget.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::fingerprint::{random_profile, BrowserProfile};

/// Delay between retry attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Browser-emulating HTTP fetcher with bounded retry.
pub struct Fetcher {
    client: Client,
    profile: Arc<RwLock<BrowserProfile>>,
    max_attempts: u32,
    feed_timeout: Duration,
}

impl Fetcher {
    /// Build a fetcher from the engine configuration.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let profile = random_profile();

        let client = Client::builder()
            .default_headers(profile.to_headers())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .zstd(true)
            .deflate(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.page_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            profile: Arc::new(RwLock::new(profile)),
            max_attempts: config.max_attempts.max(1),
            feed_timeout: config.feed_timeout,
        })
    }

    /// Fetch a page body as text.
    ///
    /// The request carries the profile headers plus a `Referer`: the explicit
    /// value when given, otherwise the URL's own origin. On 403 the user
    /// agent is rotated before the next attempt; transport errors retry
    /// without rotation; other HTTP errors fail immediately.
    pub async fn fetch_page(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let referer = match referer {
            Some(r) => r.to_string(),
            None => origin_of(url).unwrap_or_default(),
        };

        let mut last_error = ResolveError::NotAvailable;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let user_agent = self.profile.read().await.user_agent.clone();
            debug!(url, attempt, "fetching page");

            let mut request = self
                .client
                .get(url)
                .header(USER_AGENT, &user_agent)
                .header("Sec-Fetch-Site", "same-origin");
            if let Ok(v) = HeaderValue::from_str(&referer) {
                request = request.header(REFERER, v);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }
                    if status == StatusCode::FORBIDDEN {
                        warn!(url, attempt, "blocked with 403, rotating user agent");
                        self.rotate_user_agent().await;
                        last_error = ResolveError::Blocked { url: url.to_string() };
                        continue;
                    }
                    // Non-403 HTTP errors are not worth retrying.
                    return Err(ResolveError::Fetch {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "transport error");
                    last_error = ResolveError::Transport(err);
                }
            }
        }

        Err(last_error)
    }

    /// Check whether a link still answers (HEAD, redirects followed).
    pub async fn probe(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().as_u16() < 400,
            Err(_) => false,
        }
    }

    /// Current user agent, for callers composing their own header sets.
    pub async fn user_agent(&self) -> String {
        self.profile.read().await.user_agent.clone()
    }

    /// Configured per-request budget for listen-feed fetches.
    #[must_use]
    pub fn feed_timeout(&self) -> Duration {
        self.feed_timeout
    }

    /// The underlying client, for requests needing custom headers
    /// (listen feeds, registry refreshes).
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn rotate_user_agent(&self) {
        self.profile.write().await.rotate_user_agent();
    }
}

/// Origin (`scheme://host/`) of a URL, used as the default referer.
pub(crate) fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}/", parsed.scheme(), host))
}
