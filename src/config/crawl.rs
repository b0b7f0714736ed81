//! Crawl engine configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Tuning knobs for the crawl/check engine. All values are read at
/// construction time; a running job never observes changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// User agent sent with every request and matched against robots groups
    pub user_agent: String,
    /// Link probes allowed in flight across all hosts
    pub global_concurrency: usize,
    /// Link probes allowed in flight per host
    pub per_host_concurrency: usize,
    /// Base delay between probes to the same host (milliseconds)
    pub host_delay_ms: u64,
    /// Uniform jitter applied to the host delay (plus or minus, milliseconds)
    pub jitter_ms: u64,
    /// Lower bound of the page-fetch pre-delay (milliseconds, inclusive)
    pub page_delay_min_ms: u64,
    /// Upper bound of the page-fetch pre-delay (milliseconds, exclusive)
    pub page_delay_max_ms: u64,
    /// Wait before the single probe retry (milliseconds)
    pub retry_backoff_ms: u64,
    /// Largest robots.txt body accepted before failing open (bytes)
    pub robots_max_body_bytes: usize,
    /// Hard cap on pages enqueued per job
    pub max_urls: usize,
    /// Ceiling for the per-job max depth parameter
    pub max_depth_ceiling: usize,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            global_concurrency: 8,
            per_host_concurrency: 2,
            host_delay_ms: 600,
            jitter_ms: 50,
            page_delay_min_ms: 400,
            page_delay_max_ms: 700,
            retry_backoff_ms: 500,
            robots_max_body_bytes: 2 * 1024 * 1024,
            max_urls: 2000,
            max_depth_ceiling: 5,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
        }
    }
}
