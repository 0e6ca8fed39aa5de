//! Time-bounded in-memory caching.
//!
//! Expiry is checked at every read; nothing sweeps in the background.
//! Records are evicted lazily on an expired read or replaced by overwrite.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// A cached payload with its expiry timestamp.
#[derive(Debug, Clone)]
pub struct CacheRecord<T> {
    payload: T,
    expires_at: Instant,
}

impl<T> CacheRecord<T> {
    /// Wrap a payload, valid for `ttl` from now.
    pub fn new(payload: T, ttl: Duration) -> Self {
        Self { payload, expires_at: Instant::now() + ttl }
    }

    /// Whether the record has passed its expiry timestamp.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// The payload if still fresh, regardless of expiry bookkeeping.
    #[must_use]
    pub fn fresh(&self) -> Option<&T> {
        if self.is_expired() {
            None
        } else {
            Some(&self.payload)
        }
    }

    /// The payload unconditionally (stale-but-available reads).
    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

/// Keyed response cache with lazy read-time expiry.
pub struct ResponseCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheRecord<T>>>,
}

impl<T: Clone> ResponseCache<T> {
    /// Create an empty cache whose records live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Look up a key; expired records are evicted and miss.
    pub async fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(record) if !record.is_expired() => Some(record.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value under a key, replacing any previous record.
    pub async fn insert(&self, key: &str, value: T) {
        self.insert_with_ttl(key, value, self.ttl).await;
    }

    /// Store a value with an explicit TTL.
    pub async fn insert_with_ttl(&self, key: &str, value: T, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), CacheRecord::new(value, ttl));
    }
}
