//! The crawl/check engine
//!
//! Given a start page, crawls the site breadth-first within a depth bound,
//! discovers outbound hyperlinks, probes each discovered URL for
//! reachability, and streams per-link records to a sink. Key components:
//!
//! - `UrlNormalizer`: canonical URL forms and same-site scoping
//! - `RobotsGuard`: robots.txt gate for the start host (fail-open)
//! - `LinkChecker`: concurrency-capped, politely paced reachability probes
//! - `PageFetcher`: serialized page fetches with a private-host guard
//! - `Crawler`: the breadth-first loop tying it all together

pub mod checker;
pub mod controller;
pub mod fetcher;
pub mod normalize;
pub mod robots;
pub mod types;

pub use checker::{CheckReport, LinkChecker};
pub use controller::Crawler;
pub use fetcher::{extract_links, FetchedPage, PageFetcher};
pub use normalize::UrlNormalizer;
pub use robots::RobotsGuard;
pub use types::{CrawlError, CrawlProgress, JobParams, LinkRecord, ProgressFn, SinkFn};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::CrawlConfig;

/// Run one crawl job to completion, failure, or cancellation.
///
/// Validates the start URL, clamps the depth to the configured ceiling,
/// builds the engine, and drives it. The progress callback may fire many
/// times per second and must not block; the sink receives records
/// concurrently from probe tasks.
pub async fn start_crawl(
    params: &JobParams,
    config: &CrawlConfig,
    ctx: CancellationToken,
    progress: ProgressFn,
    sink: SinkFn,
) -> Result<(), CrawlError> {
    let start = Url::parse(&params.start_url).map_err(|_| CrawlError::StartNotAllowed)?;
    if !matches!(start.scheme(), "http" | "https") {
        return Err(CrawlError::StartNotAllowed);
    }

    let max_depth = params.max_depth.min(config.max_depth_ceiling);

    let checker = Arc::new(LinkChecker::new(config)?);
    let crawler = Crawler::new(&start, max_depth, params.respect_robots, config, checker).await?;
    crawler.crawl(ctx, &start, progress, sink).await
}
