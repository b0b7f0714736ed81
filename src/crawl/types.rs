//! Result and progress records emitted by the crawl engine

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters for a crawl job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    /// Absolute http/https URL to start from
    pub start_url: String,
    /// Crawl depth from the start page (root is depth 0)
    #[serde(default)]
    pub max_depth: usize,
    /// Honor the start host's robots.txt
    #[serde(default)]
    pub respect_robots: bool,
}

/// Per-link result streamed to the sink.
///
/// One record is emitted for every probed link, plus one synthetic record
/// (status 0) for every page that failed to fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    /// The link as discovered (after resolution against the page base)
    pub url: String,
    /// The page the link was found on, after redirects
    pub page_url: String,
    /// Whether the link shares the start URL's registrable domain
    pub internal: bool,
    /// HTTP status of the probe; 0 on network error
    pub status_code: u16,
    /// Error text; empty on success
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Total probe wall-clock time in milliseconds
    pub elapsed_ms: u64,
    /// Depth of the page the link was found on
    pub depth: usize,
}

/// Counter snapshot emitted to the progress observer.
///
/// Each counter is individually monotonic, but a snapshot is not a
/// consistent cross-counter view when multiple emitters race.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    /// Pages dequeued and fetched (or attempted)
    pub visited: u64,
    /// Pages currently waiting in the frontier
    pub queued: u64,
    /// Pages ever enqueued (bounded by the hard URL cap)
    pub discovered: u64,
    /// Page fetch failures
    pub errors: u64,
    /// Link probes completed
    pub checked_links: u64,
    /// Links ever registered for probing
    pub total_links: u64,
}

/// Observer invoked with progress snapshots; must be non-blocking.
pub type ProgressFn = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

/// Observer invoked once per probed link and once per page-fetch error;
/// invocations arrive concurrently from probe tasks.
pub type SinkFn = Arc<dyn Fn(LinkRecord) + Send + Sync>;

/// Fatal crawl failures. Per-link and per-page failures are recorded as
/// [`LinkRecord`]s and never surface here.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The start URL failed admission (bad scheme, out of scope, or
    /// blocked by robots.txt)
    #[error("start URL not allowed")]
    StartNotAllowed,

    /// The cancellation signal fired
    #[error("crawl canceled")]
    Canceled,

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
