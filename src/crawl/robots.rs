//! robots.txt gate for the start host
//!
//! The guard is fetched once at crawl construction and frozen. Any failure
//! along the way (network, status >= 400, oversized body, parse error)
//! produces a fail-open guard that allows every path and advertises no
//! crawl delay.

use std::time::Duration;

use reqwest::Client;
use texting_robots::Robot;
use tracing::debug;
use url::Url;

/// Immutable robots.txt rules for a single host.
pub struct RobotsGuard {
    rules: Option<Robot>,
}

impl RobotsGuard {
    /// Fetch and parse `{scheme}://{host}/robots.txt`.
    ///
    /// `max_body` caps the accepted payload; a larger body is treated the
    /// same as a fetch failure.
    pub async fn fetch(client: &Client, start: &Url, user_agent: &str, max_body: usize) -> Self {
        let mut robots_url = start.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        let mut response = match client.get(robots_url.as_str()).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("robots.txt fetch failed, allowing all: {err}");
                return Self::allow_all();
            }
        };
        if response.status().as_u16() >= 400 {
            debug!("robots.txt returned {}, allowing all", response.status());
            return Self::allow_all();
        }

        let mut body: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > max_body {
                        debug!("robots.txt exceeds {max_body} bytes, allowing all");
                        return Self::allow_all();
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(err) => {
                    debug!("robots.txt body read failed, allowing all: {err}");
                    return Self::allow_all();
                }
            }
        }

        Self::from_bytes(user_agent, &body)
    }

    /// Parse robots.txt content for the given agent. Parse failures fall
    /// open.
    pub fn from_bytes(user_agent: &str, body: &[u8]) -> Self {
        match Robot::new(user_agent, body) {
            Ok(rules) => Self { rules: Some(rules) },
            Err(err) => {
                debug!("robots.txt parse failed, allowing all: {err}");
                Self::allow_all()
            }
        }
    }

    /// A guard that permits everything.
    pub fn allow_all() -> Self {
        Self { rules: None }
    }

    /// Whether the URL's path may be fetched. The agent group was selected
    /// at parse time, with `*` as fallback; absent rules allow.
    pub fn allowed(&self, url: &Url) -> bool {
        match &self.rules {
            Some(rules) => rules.allowed(url.as_str()),
            None => true,
        }
    }

    /// Advisory delay between requests to the host, zero when absent.
    pub fn crawl_delay(&self) -> Duration {
        self.rules
            .as_ref()
            .and_then(|rules| rules.delay)
            .map(Duration::from_secs_f32)
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "PulseLinkChecker";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn wildcard_group_applies() {
        let guard = RobotsGuard::from_bytes(
            AGENT,
            b"User-agent: *\nDisallow: /private/\nAllow: /private/public\n",
        );
        assert!(guard.allowed(&url("https://a.test/open")));
        assert!(!guard.allowed(&url("https://a.test/private/x")));
        assert!(guard.allowed(&url("https://a.test/private/public")));
    }

    #[test]
    fn specific_group_wins_over_wildcard() {
        let guard = RobotsGuard::from_bytes(
            AGENT,
            b"User-agent: *\nDisallow: /\n\nUser-agent: PulseLinkChecker\nDisallow: /admin/\n",
        );
        assert!(guard.allowed(&url("https://a.test/open")));
        assert!(!guard.allowed(&url("https://a.test/admin/settings")));
    }

    #[test]
    fn disallow_all_blocks_root() {
        let guard = RobotsGuard::from_bytes(AGENT, b"User-agent: *\nDisallow: /\n");
        assert!(!guard.allowed(&url("https://a.test/")));
        assert!(!guard.allowed(&url("https://a.test/any/page")));
    }

    #[test]
    fn empty_rules_allow_everything() {
        let guard = RobotsGuard::from_bytes(AGENT, b"");
        assert!(guard.allowed(&url("https://a.test/anything")));
        assert_eq!(guard.crawl_delay(), Duration::ZERO);
    }

    #[test]
    fn fail_open_allows_everything() {
        let guard = RobotsGuard::allow_all();
        assert!(guard.allowed(&url("https://a.test/private/x")));
        assert_eq!(guard.crawl_delay(), Duration::ZERO);
    }

    #[test]
    fn crawl_delay_is_reported() {
        let guard =
            RobotsGuard::from_bytes(AGENT, b"User-agent: *\nCrawl-delay: 2\nDisallow: /tmp/\n");
        assert_eq!(guard.crawl_delay(), Duration::from_secs(2));
    }
}
