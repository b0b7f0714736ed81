//! Page fetching and anchor extraction
//!
//! Fetches one page at a time for the crawl loop, with a private-host guard
//! and a jittered pre-request delay. Extraction resolves anchors against the
//! response's final URL, which may differ from the request URL after
//! redirects.

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::{Host, Url};

use crate::config::CrawlConfig;

use super::checker::build_client;

/// Page fetch failure. `PrivateHost` and `Canceled` are terminal for the
/// request; anything else becomes a status-0 record in the crawl output.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("blocked private/loopback host")]
    PrivateHost,
    #[error("fetch canceled")]
    Canceled,
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// A fetched page, body fully read.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; the base for link resolution
    pub final_url: Url,
    pub status_code: u16,
    pub body: String,
}

/// Serialized page fetcher used by the crawl controller.
pub struct PageFetcher {
    client: Client,
    delay_min_ms: u64,
    delay_max_ms: u64,
}

impl PageFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(config)?,
            delay_min_ms: config.page_delay_min_ms,
            delay_max_ms: config.page_delay_max_ms,
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch a page. Rejects private/loopback hosts before any network
    /// activity, then sleeps a uniform pre-request delay. The body is read
    /// to completion; a body read failure yields an empty body rather than
    /// an error, which downstream extraction treats as a zero-link page.
    pub async fn fetch(&self, ctx: &CancellationToken, url: &Url) -> Result<FetchedPage, FetchError> {
        if is_private_host(url) {
            return Err(FetchError::PrivateHost);
        }

        let wait = rand::thread_rng().gen_range(self.delay_min_ms..self.delay_max_ms);
        tokio::select! {
            _ = ctx.cancelled() => return Err(FetchError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(wait)) => {}
        }

        let response = tokio::select! {
            _ = ctx.cancelled() => return Err(FetchError::Canceled),
            result = self.client.get(url.as_str()).send() => result?,
        };

        let final_url = response.url().clone();
        let status_code = response.status().as_u16();

        let body = tokio::select! {
            _ = ctx.cancelled() => return Err(FetchError::Canceled),
            result = response.text() => result.unwrap_or_default(),
        };

        Ok(FetchedPage {
            final_url,
            status_code,
            body,
        })
    }
}

/// Extract anchor targets from a page in document order.
///
/// Keeps only http/https URLs that resolve against the page's final URL.
/// Unparseable bodies simply yield nothing; extraction never fails.
pub fn extract_links(page: &FetchedPage) -> Vec<Url> {
    let document = Html::parse_document(&page.body);
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        if let Ok(resolved) = page.final_url.join(href) {
            if matches!(resolved.scheme(), "http" | "https") {
                links.push(resolved);
            }
        }
    }
    links
}

/// True for hosts the crawler must never touch: localhost, loopback,
/// RFC1918 private ranges, and link-local addresses (v4 and v6). Keeps the
/// crawler from being pointed at internal networks.
fn is_private_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => {
            ip.is_loopback()
                || ip.is_private()
                || ip.is_link_local()
                || (ip.octets()[0] == 224 && ip.octets()[1] == 0 && ip.octets()[2] == 0)
        }
        Some(Host::Ipv6(ip)) => {
            ip.is_loopback()
                || ip.is_unique_local()
                || ip.is_unicast_link_local()
                || (ip.segments()[0] & 0xff0f) == 0xff02
        }
        None => false,
    }
}
