//! Browser identity emulation.
//!
//! Outbound requests carry a realistic browser header set so the scraped
//! sites serve the same markup they serve a real visitor. A small fixed
//! pool of user agents backs the 403 rotation in the fetch layer.

use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT,
};

/// Fixed user-agent pool used for rotation after a block response.
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Browser profile with a realistic header fingerprint.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
    pub sec_fetch_dest: String,
    pub sec_fetch_mode: String,
    pub sec_fetch_site: String,
    pub sec_fetch_user: String,
}

/// Generate a Chrome-on-Windows profile (the pool's most common identity).
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    BrowserProfile {
        user_agent: USER_AGENT_POOL[0].to_string(),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8".to_string(),
        accept_language: "es-ES,es;q=0.9,en;q=0.8".to_string(),
        accept_encoding: "gzip, deflate, br, zstd".to_string(),
        sec_ch_ua: "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"".to_string(),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_platform: "\"Windows\"".to_string(),
        sec_fetch_dest: "document".to_string(),
        sec_fetch_mode: "navigate".to_string(),
        sec_fetch_site: "none".to_string(),
        sec_fetch_user: "?1".to_string(),
    }
}

/// Pick a profile with a random user agent from the pool.
#[must_use]
pub fn random_profile() -> BrowserProfile {
    let mut profile = chrome_profile();
    let mut rng = rand::thread_rng();
    if let Some(ua) = USER_AGENT_POOL.choose(&mut rng) {
        profile.user_agent = (*ua).to_string();
    }
    profile
}

impl BrowserProfile {
    /// Rotate to a different user agent from the pool.
    pub fn rotate_user_agent(&mut self) {
        let mut rng = rand::thread_rng();
        let candidates: Vec<&&str> = USER_AGENT_POOL
            .iter()
            .filter(|ua| **ua != self.user_agent)
            .collect();
        if let Some(ua) = candidates.choose(&mut rng) {
            self.user_agent = (**ua).to_string();
        }
    }

    /// Build the default header map for an HTTP client using this profile.
    #[must_use]
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let mut insert = |name: &'static str, value: &str| {
            if let Ok(v) = HeaderValue::from_str(value) {
                headers.insert(name, v);
            }
        };

        insert("sec-ch-ua", &self.sec_ch_ua);
        insert("sec-ch-ua-mobile", &self.sec_ch_ua_mobile);
        insert("sec-ch-ua-platform", &self.sec_ch_ua_platform);
        insert("Sec-Fetch-Dest", &self.sec_fetch_dest);
        insert("Sec-Fetch-Mode", &self.sec_fetch_mode);
        insert("Sec-Fetch-Site", &self.sec_fetch_site);
        insert("Sec-Fetch-User", &self.sec_fetch_user);
        insert("Upgrade-Insecure-Requests", "1");
        insert("DNT", "1");
        insert("Cache-Control", "max-age=0");

        if let Ok(v) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.accept) {
            headers.insert(ACCEPT, v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, v);
        }
        if let Ok(v) = HeaderValue::from_str(&self.accept_encoding) {
            headers.insert(ACCEPT_ENCODING, v);
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_has_distinct_agents() {
        let mut seen = std::collections::HashSet::new();
        for ua in USER_AGENT_POOL {
            assert!(seen.insert(*ua), "duplicate user agent in pool");
        }
        assert!(USER_AGENT_POOL.len() >= 4);
    }

    #[test]
    fn rotation_changes_user_agent() {
        let mut profile = chrome_profile();
        let before = profile.user_agent.clone();
        profile.rotate_user_agent();
        assert_ne!(profile.user_agent, before);
        assert!(USER_AGENT_POOL.contains(&profile.user_agent.as_str()));
    }

    #[test]
    fn headers_carry_browser_identity() {
        let headers = chrome_profile().to_headers();
        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key("Sec-Fetch-Mode"));
        assert_eq!(headers.get("sec-ch-ua-mobile").unwrap(), "?0");
    }
}
