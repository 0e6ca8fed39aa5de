//! `cinelink` - stream-link resolution engine
//!
//! Resolves a movie or series episode to playable stream URLs by walking a
//! prioritized set of external sources:
//!
//! - **Verified registry**: a hosted JSON document maps known titles to
//!   listen-feed handles; the feed parser turns those into per-language
//!   server links instantly.
//! - **Site scrapers**: polymorphic per-site extractors with browser header
//!   emulation, bounded retry, and user-agent rotation on block responses.
//! - **Caching**: 30-minute in-memory caches for the registry document and
//!   per-request results; season feeds are fetched once and sliced per
//!   episode.
//!
//! # Example
//!
//! ```rust,no_run
//! use cinelink::{Resolver, ResolveOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = Resolver::from_env()?;
//!     let result = resolver.resolve_movie("603692", &ResolveOptions::default()).await;
//!     for link in &result.links {
//!         println!("{} [{}] {}", link.server, link.language, link.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod episodes;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod fingerprint;
pub mod registry;
pub mod resolve;
pub mod scrape;

pub use cache::{CacheRecord, ResponseCache};
pub use config::ResolverConfig;
pub use error::{ResolveError, Result};
pub use fetch::Fetcher;
pub use fingerprint::{chrome_profile, random_profile, BrowserProfile};
pub use registry::{ContentKind, RegistryCache, RegistryEntry, RegistryStats};
pub use resolve::{ResolutionResult, ResolveOptions, Resolver};
pub use scrape::{ScrapeOptions, ScraperSet, SiteScraper, StreamLink};

/// Version of cinelink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
