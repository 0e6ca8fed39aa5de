//! Resolution error types.
//!
//! Every component converts its failures into [`ResolveError`] at its own
//! boundary; the orchestrator absorbs component-local errors into
//! "try the next strategy" and only total exhaustion reaches the caller,
//! always as a well-formed result object rather than a raw error.

use thiserror::Error;

/// Errors raised by the resolution engine.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// HTTP request failed with a non-success status.
    #[error("fetch failed with status {status}: {url}")]
    Fetch { status: u16, url: String },

    /// 403-class response. Triggers user-agent rotation before retry.
    #[error("blocked (403) fetching {url}")]
    Blocked { url: String },

    /// The listen feed returned no parseable documents (expired session?).
    #[error("no listen data found (session expired?)")]
    NoListenData,

    /// No scraper variant claims the URL.
    #[error("no scraper recognizes this URL: {0}")]
    UnrecognizedSource(String),

    /// All strategies exhausted, nothing found.
    #[error("no links available")]
    NotAvailable,

    /// Required external endpoint or credential missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure (timeout, connection reset, DNS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not valid JSON where JSON was expected.
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl ResolveError {
    /// Stable short code carried in failure results.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch_error",
            Self::Blocked { .. } => "blocked",
            Self::NoListenData => "no_listen_data",
            Self::UnrecognizedSource(_) => "unrecognized_source",
            Self::NotAvailable => "not_available",
            Self::Configuration(_) => "configuration",
            Self::Transport(_) => "fetch_error",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Whether the fetch layer may retry after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Blocked { .. } | Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
